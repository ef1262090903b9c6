//! Core abstractions for prism.
//!
//! This crate provides the renderer-independent pieces of prism:
//! - [`TransformScopeManager`] and its scope guards, which track the
//!   observer/instance/projective-light nesting and cache derived matrices
//! - [`ResourceCache`], a keyed checkout/return cache for expensive resources
//! - [`TextureUnitAllocator`] for scoped texture slot allocation
//! - Configuration options and the frame entry point

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Field names like projection_inverse are descriptive
#![allow(clippy::struct_field_names)]

pub mod cache;
pub mod error;
pub mod frame;
pub mod instance;
pub mod light;
pub mod options;
pub mod projection;
pub mod scope;
pub mod texture_units;
pub mod transform;
pub mod view_rays;

pub use cache::{CacheStats, Receipt, ResourceAllocator, ResourceCache};
pub use error::{PrismError, Result};
pub use frame::{FrameRunner, FrameStats};
pub use instance::{compose_uv, Instance};
pub use light::ProjectiveLight;
pub use options::Options;
pub use projection::Projection;
pub use scope::{
    InstanceScope, ObserverScope, ProjectiveLightScope, ScopeRole, ScopeState,
    TransformScopeManager,
};
pub use texture_units::{TextureId, TextureUnit, TextureUnitAllocator, TextureUnitContext, UnitBinding};
pub use transform::{normal_matrix, ToMatrix, Transform};
pub use view_rays::ViewRays;

// Re-export glam types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
