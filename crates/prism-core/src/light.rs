//! Projective lights.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::projection::Projection;

/// A light that projects through a frustum, such as a spot light or a
/// shadow-casting light.
///
/// The light looks down its local `-Z` axis with `+Y` up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectiveLight {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub orientation: Quat,
    /// Light-eye→light-clip projection.
    pub projection: Projection,
}

impl ProjectiveLight {
    /// Creates a light at `position` looking along `orientation`.
    #[must_use]
    pub fn new(position: Vec3, orientation: Quat, projection: Projection) -> Self {
        Self {
            position,
            orientation,
            projection,
        }
    }

    /// Creates a light at `position` aimed at `target`.
    #[must_use]
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3, projection: Projection) -> Self {
        let view = Mat4::look_at_rh(position, target, up);
        let orientation = Quat::from_mat4(&view.inverse());
        Self::new(position, orientation.normalize(), projection)
    }

    /// Returns the direction the light is facing.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Returns the world→light-eye matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        let up = self.orientation * Vec3::Y;
        Mat4::look_to_rh(self.position, self.direction(), up)
    }

    /// Returns the light-eye→light-clip matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.to_matrix()
    }
}
