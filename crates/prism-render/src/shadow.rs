//! Shadow map generation.
//!
//! The pass opens a projective light scope under the observer and, for each
//! caster, an instance scope under that light, so every caster is drawn with
//! light-relative matrices.

use glam::Mat3;
use prism_core::{Instance, ObserverScope, PrismError, ProjectiveLight, Receipt};

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::render_target::{RenderTarget, RenderTargetCache, RenderTargetDesc};
use crate::uniforms::{InstanceUniforms, LightUniforms};

/// Something that can be drawn into a shadow map.
pub trait ShadowCaster {
    /// The instance placement to draw.
    fn instance(&self) -> &Instance;

    /// Records the depth-only draw for this caster.
    ///
    /// `uniforms` holds the light-relative matrices; the caster is
    /// responsible for uploading them with its own pipeline.
    fn encode_depth(&self, pass: &mut wgpu::RenderPass<'_>, uniforms: &InstanceUniforms);
}

/// Light and per-caster uniforms, in caster order.
#[derive(Debug, Clone)]
pub struct ShadowBatch {
    pub light: LightUniforms,
    pub casters: Vec<InstanceUniforms>,
}

/// A rendered shadow map. Return `depth` to the cache once sampled.
pub struct ShadowMap<'c> {
    pub depth: Receipt<'c, RenderTargetDesc, RenderTarget>,
    pub light: LightUniforms,
}

/// Renders depth from a projective light.
#[derive(Debug, Clone, Copy)]
pub struct ShadowMapPass {
    size: u32,
}

impl ShadowMapPass {
    /// Creates a pass rendering `size`×`size` shadow maps.
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the description of the depth target this pass checks out.
    pub fn target_desc(&self) -> RenderTargetDesc {
        RenderTargetDesc::depth(self.size)
    }

    /// Computes the uniforms the pass would draw with, without a GPU.
    pub fn collect(
        &self,
        observer: &ObserverScope<'_>,
        light: &ProjectiveLight,
        casters: &[&dyn ShadowCaster],
    ) -> prism_core::Result<ShadowBatch> {
        let mut uniforms = Vec::with_capacity(casters.len());
        let light = visit_casters(observer, light, casters, |_, caster_uniforms| {
            uniforms.push(*caster_uniforms);
        })?;
        Ok(ShadowBatch {
            light,
            casters: uniforms,
        })
    }

    /// Encodes the shadow map for `light`.
    pub fn render<'c>(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        targets: &'c RenderTargetCache,
        observer: &ObserverScope<'_>,
        light: &ProjectiveLight,
        casters: &[&dyn ShadowCaster],
    ) -> RenderResult<ShadowMap<'c>> {
        let mut depth = targets.checkout(&self.target_desc())?;
        depth.needs_clear = false;
        log::debug!(
            "shadow map {}: {} casters on {}",
            depth.id,
            casters.len(),
            gpu.adapter_info().name
        );

        let light = {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Map Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            visit_casters(observer, light, casters, |caster, uniforms| {
                caster.encode_depth(&mut pass, uniforms);
            })?
        };

        Ok(ShadowMap { depth, light })
    }
}

/// Opens the light scope and one instance scope per caster, calling `f`
/// while each instance scope is open.
fn visit_casters<F>(
    observer: &ObserverScope<'_>,
    light: &ProjectiveLight,
    casters: &[&dyn ShadowCaster],
    mut f: F,
) -> prism_core::Result<LightUniforms>
where
    F: FnMut(&dyn ShadowCaster, &InstanceUniforms),
{
    observer.with_projective_light(light, |light_scope| {
        for &caster in casters {
            light_scope.with_instance(caster.instance(), Mat3::IDENTITY, |scope| {
                f(caster, &InstanceUniforms::from_scope(scope));
                Ok::<_, PrismError>(())
            })?;
        }
        Ok(LightUniforms::from_scope(light_scope))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use prism_core::{Projection, ScopeState, Transform, TransformScopeManager};

    struct Cube(Instance);

    impl ShadowCaster for Cube {
        fn instance(&self) -> &Instance {
            &self.0
        }

        fn encode_depth(&self, _pass: &mut wgpu::RenderPass<'_>, _uniforms: &InstanceUniforms) {}
    }

    fn light() -> ProjectiveLight {
        ProjectiveLight::looking_at(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::ZERO,
            Vec3::Z,
            Projection::orthographic_symmetric(5.0, 5.0, 0.1, 25.0),
        )
    }

    #[test]
    fn test_collect_uses_light_relative_matrices() {
        let manager = TransformScopeManager::new();
        let view = Mat4::look_at_rh(Vec3::new(4.0, 4.0, 4.0), Vec3::ZERO, Vec3::Y);
        let observer = manager.enter_observer(view, Projection::default()).unwrap();
        let a = Cube(Instance::single(Transform::from_translation(Vec3::X)));
        let b = Cube(Instance::single(Transform::from_translation(Vec3::NEG_Z * 2.0)));
        let light = light();

        let batch = ShadowMapPass::new(1024)
            .collect(&observer, &light, &[&a, &b])
            .unwrap();

        assert_eq!(batch.casters.len(), 2);
        let expected = light.view_matrix() * Mat4::from_translation(Vec3::X);
        assert!(batch.casters[0].model_view_matrix().abs_diff_eq(expected, 1e-5));
        let expected_mvp = light.projection_matrix() * expected;
        assert!(batch.casters[0]
            .model_view_projection_matrix()
            .abs_diff_eq(expected_mvp, 1e-4));
        // Scopes opened by the pass are closed again.
        assert_eq!(manager.state(), ScopeState::Observer);
    }

    #[test]
    fn test_collect_fails_while_instance_open() {
        let manager = TransformScopeManager::new();
        let observer = manager
            .enter_observer(Mat4::IDENTITY, Projection::default())
            .unwrap();
        let cube = Cube(Instance::batched(1));
        let _open = observer.enter_instance(cube.instance(), Mat3::IDENTITY).unwrap();
        let result = ShadowMapPass::new(256).collect(&observer, &light(), &[&cube]);
        assert!(matches!(result, Err(PrismError::InstanceAlreadyActive)));
        assert_eq!(manager.state(), ScopeState::ObserverInstance);
    }

    #[test]
    fn test_target_desc_is_depth() {
        let desc = ShadowMapPass::new(512).target_desc();
        assert!(desc.is_depth());
        assert_eq!((desc.width, desc.height), (512, 512));
    }
}
