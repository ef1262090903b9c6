//! Frustum corner rays for eye-space position reconstruction.
//!
//! Deferred light passes only have a screen position and a depth for each
//! pixel. The rays computed here let them recover the eye-space position
//! without multiplying by the inverse projection per pixel.

use glam::{Mat4, Vec2, Vec3};

/// Corner origins on the near plane and corner rays toward the far plane.
///
/// Corners are ordered `x0y0, x1y0, x0y1, x1y1` where `x0`/`y0` is the
/// bottom-left of normalized device coordinates. Every ray is scaled so that
/// its `z` component is `-1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRays {
    /// Eye-space near-plane positions of the four corners.
    pub origins: [Vec3; 4],
    /// Eye-space ray per corner with `z == -1`.
    pub rays: [Vec3; 4],
}

const CORNERS: [Vec2; 4] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(1.0, 1.0),
];

impl ViewRays {
    /// Computes the rays from an inverse projection matrix.
    #[must_use]
    pub fn from_inverse_projection(projection_inverse: Mat4) -> Self {
        let mut origins = [Vec3::ZERO; 4];
        let mut rays = [Vec3::ZERO; 4];
        for (i, corner) in CORNERS.iter().enumerate() {
            let near = projection_inverse.project_point3(corner.extend(0.0));
            let far = projection_inverse.project_point3(corner.extend(1.0));
            origins[i] = near;
            rays[i] = (far - near) / (near.z - far.z);
        }
        Self { origins, rays }
    }

    /// Reconstructs an eye-space position.
    ///
    /// `uv` is the screen position in `[0, 1]²` with `(0, 0)` at the bottom
    /// left, and `eye_z` is the (negative) eye-space depth of the surface.
    #[must_use]
    pub fn position_at(&self, uv: Vec2, eye_z: f32) -> Vec3 {
        let origin = bilinear(&self.origins, uv);
        let ray = bilinear(&self.rays, uv);
        origin + ray * (origin.z - eye_z)
    }
}

impl Default for ViewRays {
    fn default() -> Self {
        Self::from_inverse_projection(Mat4::IDENTITY)
    }
}

fn bilinear(corners: &[Vec3; 4], uv: Vec2) -> Vec3 {
    let bottom = corners[0].lerp(corners[1], uv.x);
    let top = corners[2].lerp(corners[3], uv.x);
    bottom.lerp(top, uv.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Projection;

    #[test]
    fn test_rays_have_unit_negative_z() {
        let proj = Projection::perspective(1.1, 1.6, 0.1, 100.0).to_matrix();
        let rays = ViewRays::from_inverse_projection(proj.inverse());
        for ray in rays.rays {
            assert!((ray.z + 1.0).abs() < 1e-4);
        }
        for origin in rays.origins {
            assert!((origin.z + 0.1).abs() < 1e-4);
        }
    }

    #[test]
    fn test_reconstruct_center_perspective() {
        let proj = Projection::perspective(1.0, 1.0, 0.5, 50.0).to_matrix();
        let rays = ViewRays::from_inverse_projection(proj.inverse());
        let p = rays.position_at(Vec2::splat(0.5), -5.0);
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-3));
    }

    #[test]
    fn test_reconstruct_matches_projection() {
        let proj = Projection::perspective(0.9, 1.3, 0.2, 80.0).to_matrix();
        let rays = ViewRays::from_inverse_projection(proj.inverse());
        let eye = Vec3::new(1.5, -0.75, -12.0);
        let ndc = proj.project_point3(eye);
        let uv = Vec2::new(ndc.x * 0.5 + 0.5, ndc.y * 0.5 + 0.5);
        let p = rays.position_at(uv, eye.z);
        assert!(p.abs_diff_eq(eye, 1e-2));
    }

    #[test]
    fn test_reconstruct_orthographic() {
        let proj = Projection::orthographic_symmetric(4.0, 2.0, 1.0, 30.0).to_matrix();
        let rays = ViewRays::from_inverse_projection(proj.inverse());
        // Orthographic rays are parallel to the view axis.
        for ray in rays.rays {
            assert!(ray.abs_diff_eq(Vec3::NEG_Z, 1e-4));
        }
        let p = rays.position_at(Vec2::new(1.0, 0.5), -10.0);
        assert!(p.abs_diff_eq(Vec3::new(4.0, 0.0, -10.0), 1e-3));
    }
}
