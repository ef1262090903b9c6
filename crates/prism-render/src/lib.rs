//! Rendering backend for prism.
//!
//! This crate provides the wgpu-side collaborators of the scope and cache
//! core:
//! - Cached offscreen render targets and shader programs
//! - Uniform blocks built from live transform scopes
//! - Ping-pong blur and shadow map passes
//! - A headless GPU context

pub mod blur;
pub mod context;
pub mod error;
pub mod program;
pub mod render_target;
pub mod shadow;
pub mod uniforms;

pub use blur::{copy_target, BlurFilter, BlurStep};
pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use program::{
    Program, ProgramAllocator, ProgramCache, ProgramKey, ShaderLibrary, BLUR_PROGRAM, COPY_PROGRAM,
};
pub use render_target::{
    render_target_cache, RenderTarget, RenderTargetAllocator, RenderTargetCache, RenderTargetDesc,
};
pub use shadow::{ShadowBatch, ShadowCaster, ShadowMap, ShadowMapPass};
pub use uniforms::{BlurUniforms, InstanceUniforms, LightUniforms, ObserverUniforms};
