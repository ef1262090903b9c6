//! Drawable instances as seen by the scope manager.
//!
//! The manager only needs two things from an instance: where it is placed and
//! how its texture coordinates are transformed. Everything else about an
//! instance (meshes, materials, instance buffers) belongs to the render passes.

use glam::{Mat3, Mat4};

use crate::transform::{ToMatrix, Transform};

/// A drawable instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    /// A single placed object.
    Single {
        /// Object→world placement.
        transform: Transform,
        /// Per-instance texture-space transform.
        uv_matrix: Mat3,
    },
    /// A batch whose per-instance placements live in an instance buffer.
    ///
    /// The shader applies each placement itself, so the scope's model matrix
    /// is the identity.
    Batched {
        /// Number of instances in the batch.
        count: u32,
        /// Texture-space transform shared by the whole batch.
        uv_matrix: Mat3,
    },
}

impl Instance {
    /// Creates a single instance with an identity UV transform.
    #[must_use]
    pub fn single(transform: Transform) -> Self {
        Instance::Single {
            transform,
            uv_matrix: Mat3::IDENTITY,
        }
    }

    /// Creates a batched instance with an identity UV transform.
    #[must_use]
    pub fn batched(count: u32) -> Self {
        Instance::Batched {
            count,
            uv_matrix: Mat3::IDENTITY,
        }
    }

    /// Replaces the per-instance UV transform.
    #[must_use]
    pub fn with_uv_matrix(mut self, uv: Mat3) -> Self {
        match &mut self {
            Instance::Single { uv_matrix, .. } | Instance::Batched { uv_matrix, .. } => {
                *uv_matrix = uv;
            }
        }
        self
    }

    /// Returns the object→world matrix used by the scope manager.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        match self {
            Instance::Single { transform, .. } => transform.to_matrix(),
            Instance::Batched { .. } => Mat4::IDENTITY,
        }
    }

    /// Returns the per-instance UV transform.
    #[must_use]
    pub fn uv_matrix(&self) -> Mat3 {
        match self {
            Instance::Single { uv_matrix, .. } | Instance::Batched { uv_matrix, .. } => *uv_matrix,
        }
    }

    /// Returns the number of objects drawn for this instance.
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        match self {
            Instance::Single { .. } => 1,
            Instance::Batched { count, .. } => *count,
        }
    }
}

/// Composes an instance UV transform with a material UV transform.
///
/// The material transform is applied first, then the per-instance one.
#[must_use]
pub fn compose_uv(instance_uv: Mat3, material_uv: Mat3) -> Mat3 {
    instance_uv * material_uv
}
