//! Object placement transforms.

use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Anything that can produce an object→world matrix.
///
/// Implemented for [`Transform`] and for a raw [`Mat4`], so callers can pass
/// either to [`crate::ObserverScope::enter_generic_transform`].
pub trait ToMatrix {
    /// Returns the object→world matrix.
    fn to_matrix(&self) -> Mat4;
}

impl ToMatrix for Mat4 {
    fn to_matrix(&self) -> Mat4 {
        *self
    }
}

/// A transformation represented as separate components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation component.
    pub translation: Vec3,
    /// Rotation component as a quaternion.
    pub rotation: Quat,
    /// Scale component.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates a transform from a translation.
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Creates a transform from a rotation.
    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    /// Creates a transform from a scale.
    #[must_use]
    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    /// Sets the translation.
    #[must_use]
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Sets the rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Creates a transform from a Mat4.
    ///
    /// This decomposition may not be exact for matrices with shear.
    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

impl ToMatrix for Transform {
    fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Returns the normal matrix for a model-view matrix.
///
/// This is the inverse-transpose of the upper-left 3×3 block.
#[must_use]
pub fn normal_matrix(model_view: Mat4) -> Mat3 {
    Mat3::from_mat4(model_view).inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        assert_eq!(Transform::identity().to_matrix(), Mat4::IDENTITY);
        assert_eq!(Mat4::IDENTITY.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_translation_matrix() {
        let t = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let p = t.to_matrix().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn test_matrix_roundtrip() {
        let t = Transform::from_rotation(Quat::from_rotation_y(0.7))
            .with_translation(Vec3::new(-2.0, 0.5, 4.0))
            .with_scale(Vec3::splat(2.0));
        let back = Transform::from_matrix(t.to_matrix());
        assert!(back.translation.abs_diff_eq(t.translation, 1e-5));
        assert!(back.scale.abs_diff_eq(t.scale, 1e-5));
        assert!(back.rotation.abs_diff_eq(t.rotation, 1e-5));
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        let mv = Mat4::from_scale(Vec3::splat(2.0));
        let n = normal_matrix(mv);
        assert!(n.abs_diff_eq(Mat3::from_diagonal(Vec3::splat(0.5)), 1e-6));
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular() {
        let mv = Mat4::from_scale(Vec3::new(1.0, 4.0, 1.0));
        let n = normal_matrix(mv);
        // Surface tangent (1, 1, 0) with normal (1, -1, 0).
        let tangent = Mat3::from_mat4(mv) * Vec3::new(1.0, 1.0, 0.0);
        let normal = n * Vec3::new(1.0, -1.0, 0.0);
        assert!(tangent.dot(normal).abs() < 1e-5);
    }
}
