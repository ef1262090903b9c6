//! prism-rs: scoped transforms and checkout caches for a multi-pass renderer.
//!
//! # Quick Start
//!
//! ```no_run
//! use prism::*;
//!
//! fn main() -> RenderResult<()> {
//!     init();
//!
//!     let mut renderer = Renderer::new_headless(Options::default())?;
//!     let view = Mat4::look_at_rh(Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO, Vec3::Y);
//!     let light = ProjectiveLight::looking_at(
//!         Vec3::new(0.0, 8.0, 0.0),
//!         Vec3::ZERO,
//!         Vec3::Z,
//!         Projection::orthographic_symmetric(5.0, 5.0, 0.1, 20.0),
//!     );
//!     let scene = Scene::new(640, 480).with_light(light).with_blur(true);
//!     let report = renderer.render_frame(view, Projection::default(), &scene)?;
//!     println!("rendered frame {}", report.frame);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`TransformScopeManager`] tracks the observer → instance / projective
//!   light nesting and hands out scope guards with cached matrices.
//! - [`ResourceCache`] lends out render targets and compiled programs by
//!   description and takes them back through a [`Receipt`].
//! - [`Renderer`] owns both and runs each frame through a [`FrameRunner`],
//!   so an error aborts the frame instead of the process.

mod init;
mod renderer;

pub use init::init;
pub use renderer::{FrameReport, Renderer, Scene};

// Re-export core types
pub use prism_core::{
    CacheStats, FrameRunner, FrameStats, Instance, InstanceScope, ObserverScope, Options,
    PrismError, Projection, ProjectiveLight, ProjectiveLightScope, Receipt, ResourceAllocator,
    ResourceCache, ScopeRole, ScopeState, TextureUnitAllocator, ToMatrix, Transform,
    TransformScopeManager, ViewRays,
};
pub use prism_core::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export render types
pub use prism_render::{
    copy_target, BlurFilter, GpuContext, InstanceUniforms, LightUniforms, ObserverUniforms,
    ProgramCache, ProgramKey, RenderError, RenderResult, RenderTarget, RenderTargetCache,
    RenderTargetDesc, ShaderLibrary, ShadowCaster, ShadowMapPass,
};
