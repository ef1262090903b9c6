//! Separable ping-pong blur.
//!
//! The filter checks out two render targets with the same description as the
//! source and alternates between them:
//!
//! ```text
//! source ─H─▶ ping ─V─▶ pong      (first pass)
//!         pong ─H─▶ ping ─V─▶ pong (each further pass)
//! ```
//!
//! The result is always in `pong`; `ping` goes back to the cache before
//! [`BlurFilter::apply`] returns. [`copy_target`] writes a result back into
//! the caller's target.

use prism_core::{Receipt, TextureUnitAllocator};
use wgpu::util::DeviceExt;

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::program::{Program, ProgramCache, ProgramKey, BLUR_PROGRAM, COPY_PROGRAM};
use crate::render_target::{RenderTarget, RenderTargetCache, RenderTargetDesc};
use crate::uniforms::BlurUniforms;

/// One directional blur step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurStep {
    /// Horizontal, from the caller's source into ping.
    SourceToPing,
    /// Vertical, from ping into pong.
    PingToPong,
    /// Horizontal, from pong back into ping.
    PongToPing,
}

impl BlurStep {
    /// Returns whether the step blurs along x.
    pub fn is_horizontal(self) -> bool {
        !matches!(self, BlurStep::PingToPong)
    }
}

/// A gaussian blur applied `passes` times.
#[derive(Debug, Clone, Copy)]
pub struct BlurFilter {
    passes: u32,
}

impl BlurFilter {
    /// Creates a filter. At least one pass is always run.
    pub fn new(passes: u32) -> Self {
        Self {
            passes: passes.max(1),
        }
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Returns the steps the filter encodes, in order.
    pub fn plan(&self) -> Vec<BlurStep> {
        let mut steps = vec![BlurStep::SourceToPing, BlurStep::PingToPong];
        for _ in 1..self.passes {
            steps.push(BlurStep::PongToPing);
            steps.push(BlurStep::PingToPong);
        }
        steps
    }

    /// Encodes the blur of `source` and returns the target holding the result.
    ///
    /// Every receipt taken here other than the returned one is back in its
    /// cache when this returns, including on error.
    #[allow(clippy::too_many_arguments)]
    pub fn apply<'c>(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        targets: &'c RenderTargetCache,
        programs: &ProgramCache,
        units: &TextureUnitAllocator,
        source: &RenderTarget,
    ) -> RenderResult<Receipt<'c, RenderTargetDesc, RenderTarget>> {
        let desc = source.desc;
        if desc.is_depth() {
            return Err(RenderError::UnsupportedFormat(desc.format));
        }

        let program = programs.checkout(&ProgramKey::new(BLUR_PROGRAM, desc.format))?;
        let mut ping = targets.checkout(&desc)?;
        let mut pong = targets.checkout(&desc)?;
        let texel_size = desc.texel_size();

        for step in self.plan() {
            let uniforms = if step.is_horizontal() {
                BlurUniforms::horizontal(texel_size)
            } else {
                BlurUniforms::vertical(texel_size)
            };
            let (input, output) = match step {
                BlurStep::SourceToPing => (source, &mut *ping),
                BlurStep::PingToPong => (&*ping, &mut *pong),
                BlurStep::PongToPing => (&*pong, &mut *ping),
            };
            encode_pass(
                gpu,
                encoder,
                &program,
                units,
                input,
                output,
                bytemuck::bytes_of(&uniforms),
            )?;
        }

        ping.return_to_cache()?;
        program.return_to_cache()?;
        Ok(pong)
    }
}

/// Copies `source` into `dest` with a fullscreen pass.
///
/// Both targets must be color targets of the same format.
pub fn copy_target(
    gpu: &GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    programs: &ProgramCache,
    units: &TextureUnitAllocator,
    source: &RenderTarget,
    dest: &mut RenderTarget,
) -> RenderResult<()> {
    if dest.desc.is_depth() {
        return Err(RenderError::UnsupportedFormat(dest.desc.format));
    }
    if source.desc.format != dest.desc.format {
        return Err(RenderError::UnsupportedFormat(source.desc.format));
    }
    let program = programs.checkout(&ProgramKey::new(COPY_PROGRAM, dest.desc.format))?;
    // The copy shader ignores binding 2, but the shared layout requires it.
    let unused = [0.0_f32; 4];
    encode_pass(
        gpu,
        encoder,
        &program,
        units,
        source,
        dest,
        bytemuck::bytes_of(&unused),
    )?;
    program.return_to_cache()?;
    Ok(())
}

fn encode_pass(
    gpu: &GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    program: &Program,
    units: &TextureUnitAllocator,
    input: &RenderTarget,
    output: &mut RenderTarget,
    uniforms: &[u8],
) -> RenderResult<()> {
    units.with_context(|ctx| {
        let binding = ctx.bind(input.id)?;
        log::trace!(
            "fullscreen pass {} -> {} via unit {} (resident: {})",
            input.id,
            output.id,
            binding.unit.index(),
            binding.already_resident
        );

        let uniform_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fullscreen Uniform Buffer"),
                contents: uniforms,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fullscreen Bind Group"),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&input.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let load = output.take_load_op(wgpu::Color::TRANSPARENT);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Fullscreen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &output.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pass_plan() {
        assert_eq!(
            BlurFilter::new(1).plan(),
            vec![BlurStep::SourceToPing, BlurStep::PingToPong]
        );
    }

    #[test]
    fn test_zero_passes_runs_once() {
        assert_eq!(BlurFilter::new(0).passes(), 1);
    }

    #[test]
    fn test_multi_pass_plan_ends_in_pong() {
        let plan = BlurFilter::new(3).plan();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.last(), Some(&BlurStep::PingToPong));
        // Directions alternate.
        for (i, step) in plan.iter().enumerate() {
            assert_eq!(step.is_horizontal(), i % 2 == 0);
        }
    }
}
