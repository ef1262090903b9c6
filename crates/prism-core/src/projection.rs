//! Projection descriptors.
//!
//! A [`Projection`] is the abstract description an observer or a projective
//! light keeps around so the matrix can be regenerated. All matrices are
//! right-handed with clip-space depth in `[0, 1]`.

use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Abstract projection used to build an eye→clip matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Symmetric perspective projection.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Aspect ratio (width / height).
        aspect: f32,
        /// Near clipping plane distance.
        near: f32,
        /// Far clipping plane distance.
        far: f32,
    },
    /// Orthographic projection.
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
    /// Off-center perspective frustum. Edges are given on the near plane.
    Frustum {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    /// Creates a perspective projection.
    #[must_use]
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y,
            aspect,
            near,
            far,
        }
    }

    /// Creates an orthographic projection centered on the view axis.
    #[must_use]
    pub fn orthographic_symmetric(half_width: f32, half_height: f32, near: f32, far: f32) -> Self {
        Projection::Orthographic {
            left: -half_width,
            right: half_width,
            bottom: -half_height,
            top: half_height,
            near,
            far,
        }
    }

    /// Returns the eye→clip matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
            Projection::Frustum {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => frustum_rh(left, right, bottom, top, near, far),
        }
    }

    /// Returns the near clipping plane distance.
    #[must_use]
    pub fn near(&self) -> f32 {
        match *self {
            Projection::Perspective { near, .. }
            | Projection::Orthographic { near, .. }
            | Projection::Frustum { near, .. } => near,
        }
    }

    /// Returns the far clipping plane distance.
    #[must_use]
    pub fn far(&self) -> f32 {
        match *self {
            Projection::Perspective { far, .. }
            | Projection::Orthographic { far, .. }
            | Projection::Frustum { far, .. } => far,
        }
    }

    /// Returns true for projections that converge at the eye.
    #[must_use]
    pub fn is_perspective(&self) -> bool {
        !matches!(self, Projection::Orthographic { .. })
    }
}

impl Default for Projection {
    fn default() -> Self {
        Projection::perspective(std::f32::consts::FRAC_PI_4, 1.0, 0.01, 1000.0)
    }
}

/// Off-center perspective, right-handed, depth mapped to `[0, 1]`.
fn frustum_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let inv_width = 1.0 / (right - left);
    let inv_height = 1.0 / (top - bottom);
    let inv_depth = 1.0 / (near - far);
    Mat4::from_cols_array(&[
        2.0 * near * inv_width,
        0.0,
        0.0,
        0.0,
        0.0,
        2.0 * near * inv_height,
        0.0,
        0.0,
        (right + left) * inv_width,
        (top + bottom) * inv_height,
        far * inv_depth,
        -1.0,
        0.0,
        0.0,
        near * far * inv_depth,
        0.0,
    ])
}
