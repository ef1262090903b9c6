//! GPU uniform blocks filled from live scopes.
//!
//! The constructors take a scope guard, so a uniform block can only be built
//! while the matrices it reads are current.

use glam::{Mat3, Mat4};
use prism_core::{InstanceScope, ObserverScope, ProjectiveLightScope};

/// Pads a 3x3 matrix to the WGSL `mat3x3<f32>` layout (three `vec4` columns).
fn mat3_to_std140(m: Mat3) -> [[f32; 4]; 3] {
    let cols = m.to_cols_array_2d();
    [
        [cols[0][0], cols[0][1], cols[0][2], 0.0],
        [cols[1][0], cols[1][1], cols[1][2], 0.0],
        [cols[2][0], cols[2][1], cols[2][2], 0.0],
    ]
}

/// GPU representation of the observer matrices.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObserverUniforms {
    pub view: [[f32; 4]; 4],
    pub view_inverse: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub projection_inverse: [[f32; 4]; 4],
    /// Near-plane origins of the four corner view rays.
    pub ray_origins: [[f32; 4]; 4],
    /// Corner view ray directions, scaled to unit eye-space depth.
    pub rays: [[f32; 4]; 4],
}

impl ObserverUniforms {
    pub fn from_scope(observer: &ObserverScope<'_>) -> Self {
        let view_rays = observer.view_rays();
        Self {
            view: observer.view_matrix().to_cols_array_2d(),
            view_inverse: observer.view_matrix_inverse().to_cols_array_2d(),
            projection: observer.projection_matrix().to_cols_array_2d(),
            projection_inverse: observer.projection_matrix_inverse().to_cols_array_2d(),
            ray_origins: view_rays.origins.map(|o| o.extend(1.0).to_array()),
            rays: view_rays.rays.map(|r| r.extend(0.0).to_array()),
        }
    }
}

/// GPU representation of an instance's matrices.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceUniforms {
    pub model: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub model_view_projection: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub uv: [[f32; 4]; 3],
}

impl InstanceUniforms {
    /// Builds the block for an instance under either parent. Under a
    /// projective light the projection is the light's.
    pub fn from_scope(instance: &InstanceScope<'_>) -> Self {
        Self {
            model: instance.model_matrix().to_cols_array_2d(),
            model_view: instance.model_view_matrix().to_cols_array_2d(),
            model_view_projection: instance.model_view_projection_matrix().to_cols_array_2d(),
            normal: mat3_to_std140(instance.normal_matrix()),
            uv: mat3_to_std140(instance.uv_matrix()),
        }
    }

    pub fn model_view_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model_view)
    }

    pub fn model_view_projection_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model_view_projection)
    }
}

/// GPU representation of a projective light.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniforms {
    /// World→light-clip, for rendering the shadow map.
    pub view_projection: [[f32; 4]; 4],
    /// Observer-eye→light-clip, for shadow lookups from the main pass.
    pub eye_to_light_clip: [[f32; 4]; 4],
    /// Light position in observer eye space (w = 1).
    pub position_eye: [f32; 4],
}

impl LightUniforms {
    pub fn from_scope(light: &ProjectiveLightScope<'_>) -> Self {
        let view_projection = light.projective_projection_matrix() * light.projective_view_matrix();
        Self {
            view_projection: view_projection.to_cols_array_2d(),
            eye_to_light_clip: light.eye_to_light_clip_matrix().to_cols_array_2d(),
            position_eye: light.position_eye().extend(1.0).to_array(),
        }
    }
}

/// GPU representation of blur uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    pub direction: [f32; 2],
    pub texel_size: [f32; 2],
}

impl BlurUniforms {
    pub fn horizontal(texel_size: [f32; 2]) -> Self {
        Self {
            direction: [1.0, 0.0],
            texel_size,
        }
    }

    pub fn vertical(texel_size: [f32; 2]) -> Self {
        Self {
            direction: [0.0, 1.0],
            texel_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};
    use prism_core::{Instance, Projection, ProjectiveLight, Transform, TransformScopeManager};

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<ObserverUniforms>(), 6 * 64);
        assert_eq!(std::mem::size_of::<InstanceUniforms>(), 3 * 64 + 2 * 48);
        assert_eq!(std::mem::size_of::<LightUniforms>(), 2 * 64 + 16);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 16);
    }

    #[test]
    fn test_mat3_padding() {
        let padded = mat3_to_std140(Mat3::from_cols(Vec3::X, Vec3::Y * 2.0, Vec3::Z * 3.0));
        assert_eq!(padded[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(padded[1], [0.0, 2.0, 0.0, 0.0]);
        assert_eq!(padded[2], [0.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_instance_uniforms_from_scope() {
        let manager = TransformScopeManager::new();
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let projection = Projection::default();
        let observer = manager.enter_observer(view, projection).unwrap();
        let instance = Instance::single(Transform::from_translation(Vec3::new(1.0, 2.0, 0.0)));
        let scope = observer.enter_instance(&instance, Mat3::IDENTITY).unwrap();
        let uniforms = InstanceUniforms::from_scope(&scope);

        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 0.0));
        assert!(uniforms.model_view_matrix().abs_diff_eq(view * model, 1e-5));
        assert!(uniforms
            .model_view_projection_matrix()
            .abs_diff_eq(projection.to_matrix() * view * model, 1e-4));
    }

    #[test]
    fn test_light_uniforms_from_scope() {
        let manager = TransformScopeManager::new();
        let view = Mat4::look_at_rh(Vec3::new(0.0, 3.0, 6.0), Vec3::ZERO, Vec3::Y);
        let observer = manager.enter_observer(view, Projection::default()).unwrap();
        let light = ProjectiveLight::looking_at(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::ZERO,
            Vec3::Z,
            Projection::orthographic_symmetric(4.0, 4.0, 0.1, 30.0),
        );
        let scope = observer.enter_projective_light(&light).unwrap();
        let uniforms = LightUniforms::from_scope(&scope);

        // A world point seen through either path lands at the same light-clip position.
        let world = Vec4::new(1.0, 0.5, -2.0, 1.0);
        let via_world = Mat4::from_cols_array_2d(&uniforms.view_projection) * world;
        let via_eye = Mat4::from_cols_array_2d(&uniforms.eye_to_light_clip) * (view * world);
        assert!(via_world.abs_diff_eq(via_eye, 1e-4));

        let expected_eye = view.transform_point3(light.position);
        assert!(Vec3::from_slice(&uniforms.position_eye[..3]).abs_diff_eq(expected_eye, 1e-4));
    }

    #[test]
    fn test_observer_uniforms_from_scope() {
        let manager = TransformScopeManager::new();
        let observer = manager
            .enter_observer(Mat4::IDENTITY, Projection::default())
            .unwrap();
        let uniforms = ObserverUniforms::from_scope(&observer);
        assert_eq!(uniforms.view, Mat4::IDENTITY.to_cols_array_2d());
        for origin in uniforms.ray_origins {
            assert!((origin[3] - 1.0).abs() < f32::EPSILON);
        }
    }
}
