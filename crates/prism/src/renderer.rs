//! The frame renderer.

use std::sync::Arc;

use glam::Mat4;
use pollster::FutureExt;
use prism_core::{
    FrameRunner, FrameStats, Options, Projection, ProjectiveLight, TextureUnitAllocator,
    TransformScopeManager,
};
use prism_render::{
    copy_target, render_target_cache, BlurFilter, GpuContext, LightUniforms, ObserverUniforms,
    ProgramCache, RenderResult, RenderTargetCache, RenderTargetDesc, ShaderLibrary, ShadowCaster,
    ShadowMapPass,
};

/// What to draw in one frame.
pub struct Scene<'a> {
    /// Output size in pixels.
    pub width: u32,
    pub height: u32,
    /// Light to render a shadow map for.
    pub light: Option<ProjectiveLight>,
    /// Objects drawn into the shadow map.
    pub casters: Vec<&'a dyn ShadowCaster>,
    /// Whether to blur the color target in place.
    pub blur: bool,
}

impl<'a> Scene<'a> {
    /// Creates an empty scene of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            light: None,
            casters: Vec::new(),
            blur: false,
        }
    }

    #[must_use]
    pub fn with_light(mut self, light: ProjectiveLight) -> Self {
        self.light = Some(light);
        self
    }

    #[must_use]
    pub fn with_caster(mut self, caster: &'a dyn ShadowCaster) -> Self {
        self.casters.push(caster);
        self
    }

    #[must_use]
    pub fn with_blur(mut self, blur: bool) -> Self {
        self.blur = blur;
        self
    }
}

/// Summary of a rendered frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Observer uniforms the frame was drawn with.
    pub observer: ObserverUniforms,
    /// Light uniforms, if a shadow map was rendered.
    pub light: Option<LightUniforms>,
    /// Number of casters drawn into the shadow map.
    pub shadow_casters: usize,
    /// Whether the color target was blurred.
    pub blurred: bool,
}

/// Owns the scope manager, caches and passes, and renders frames.
pub struct Renderer {
    gpu: GpuContext,
    options: Options,
    format: wgpu::TextureFormat,
    scopes: TransformScopeManager,
    targets: RenderTargetCache,
    programs: ProgramCache,
    units: TextureUnitAllocator,
    frames: FrameRunner,
    blur: BlurFilter,
    shadows: ShadowMapPass,
}

impl Renderer {
    /// Color format of the frame targets.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates a renderer on an existing GPU context.
    pub fn new(gpu: GpuContext, options: Options) -> prism_core::Result<Self> {
        options.validate()?;
        let targets =
            render_target_cache(Arc::clone(&gpu.device), options.render_target_cache_capacity);
        let programs = ProgramCache::new(
            Arc::clone(&gpu.device),
            ShaderLibrary::with_builtins(),
            options.program_cache_capacity,
        );
        log::info!(
            "renderer created: {} render targets, {} programs, {} texture units",
            options.render_target_cache_capacity,
            options.program_cache_capacity,
            options.texture_units
        );
        Ok(Self {
            format: Self::COLOR_FORMAT,
            scopes: TransformScopeManager::new(),
            targets,
            programs,
            units: TextureUnitAllocator::new(options.texture_units),
            frames: FrameRunner::new(),
            blur: BlurFilter::new(options.blur_passes),
            shadows: ShadowMapPass::new(options.shadow_map_size),
            gpu,
            options,
        })
    }

    /// Creates a renderer on a new headless GPU context.
    pub fn new_headless(options: Options) -> RenderResult<Self> {
        let gpu = GpuContext::new_headless().block_on()?;
        Ok(Self::new(gpu, options)?)
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn scopes(&self) -> &TransformScopeManager {
        &self.scopes
    }

    pub fn render_targets(&self) -> &RenderTargetCache {
        &self.targets
    }

    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    pub fn texture_units(&self) -> &TextureUnitAllocator {
        &self.units
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.frames.stats()
    }

    /// Releases every cached resource that is not checked out.
    pub fn trim_caches(&self) {
        self.targets.trim();
        self.programs.cache().trim();
    }

    /// Renders one frame.
    ///
    /// Any error aborts this frame only: scopes are closed and receipts
    /// returned before the error reaches the caller, and the next call
    /// starts clean.
    pub fn render_frame(
        &mut self,
        view: Mat4,
        projection: Projection,
        scene: &Scene<'_>,
    ) -> RenderResult<FrameReport> {
        let Self {
            ref gpu,
            ref format,
            ref scopes,
            ref targets,
            ref programs,
            ref units,
            ref mut frames,
            ref blur,
            ref shadows,
            ..
        } = *self;

        let report = frames.run(scopes, view, projection, |observer| -> RenderResult<_> {
            let mut encoder = gpu.create_encoder("prism frame");
            let observer_uniforms = ObserverUniforms::from_scope(observer);

            let mut color =
                targets.checkout(&RenderTargetDesc::color(scene.width, scene.height, *format))?;
            {
                let load = color.take_load_op(wgpu::Color::BLACK);
                let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Frame Clear Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &color.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    ..Default::default()
                });
            }

            let shadow = match &scene.light {
                Some(light) => Some(shadows.render(
                    gpu,
                    &mut encoder,
                    targets,
                    observer,
                    light,
                    &scene.casters,
                )?),
                None => None,
            };

            let blurred = if scene.blur {
                let blurred = blur.apply(gpu, &mut encoder, targets, programs, units, &color)?;
                copy_target(gpu, &mut encoder, programs, units, &blurred, &mut color)?;
                Some(blurred)
            } else {
                None
            };

            gpu.submit(encoder);

            let report = FrameReport {
                frame: 0,
                observer: observer_uniforms,
                light: shadow.as_ref().map(|s| s.light),
                shadow_casters: if shadow.is_some() { scene.casters.len() } else { 0 },
                blurred: blurred.is_some(),
            };
            if let Some(shadow) = shadow {
                shadow.depth.return_to_cache()?;
            }
            if let Some(blurred) = blurred {
                blurred.return_to_cache()?;
            }
            color.return_to_cache()?;
            Ok(report)
        })?;

        Ok(FrameReport {
            frame: frames.frame_index(),
            ..report
        })
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("gpu", &self.gpu)
            .field("options", &self.options)
            .field("targets", &self.targets)
            .field("programs", &self.programs)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}
