//! Cached offscreen render targets.

use std::sync::Arc;

use prism_core::{PrismError, ResourceAllocator, ResourceCache, TextureId};

/// Description of a render target, used as the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub filter: wgpu::FilterMode,
}

impl RenderTargetDesc {
    /// A linearly filtered color target.
    pub fn color(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            filter: wgpu::FilterMode::Linear,
        }
    }

    /// A square 32-bit depth target, as used for shadow maps.
    pub fn depth(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            format: wgpu::TextureFormat::Depth32Float,
            filter: wgpu::FilterMode::Nearest,
        }
    }

    /// Returns whether this is a depth target.
    pub fn is_depth(&self) -> bool {
        self.format.is_depth_stencil_format()
    }

    /// Returns the size of one texel in UV units.
    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }

    fn usage(&self) -> wgpu::TextureUsages {
        wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | if self.is_depth() {
                wgpu::TextureUsages::empty()
            } else {
                wgpu::TextureUsages::COPY_SRC
            }
    }
}

/// A texture that passes can render into and sample from.
pub struct RenderTarget {
    pub id: TextureId,
    pub desc: RenderTargetDesc,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    /// Set when the target comes back out of the cache with stale contents.
    pub needs_clear: bool,
}

impl RenderTarget {
    /// Returns the load operation for the first pass that writes this target,
    /// and marks the target as cleared.
    pub fn take_load_op(&mut self, clear: wgpu::Color) -> wgpu::LoadOp<wgpu::Color> {
        if std::mem::take(&mut self.needs_clear) {
            wgpu::LoadOp::Clear(clear)
        } else {
            wgpu::LoadOp::Load
        }
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .field("needs_clear", &self.needs_clear)
            .finish_non_exhaustive()
    }
}

/// Creates render targets on a device.
pub struct RenderTargetAllocator {
    device: Arc<wgpu::Device>,
    next_id: TextureId,
}

impl RenderTargetAllocator {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device, next_id: 1 }
    }
}

/// Checks a description against the device limits.
pub fn validate_desc(desc: &RenderTargetDesc, limits: &wgpu::Limits) -> prism_core::Result<()> {
    let max = limits.max_texture_dimension_2d;
    if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
        return Err(PrismError::AllocationFailed(format!(
            "render target {}x{} outside 1..={max}",
            desc.width, desc.height
        )));
    }
    Ok(())
}

impl ResourceAllocator<RenderTargetDesc, RenderTarget> for RenderTargetAllocator {
    fn allocate(&mut self, desc: &RenderTargetDesc) -> prism_core::Result<RenderTarget> {
        validate_desc(desc, &self.device.limits())?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("prism render target"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage(),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prism render target sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: desc.filter,
            min_filter: desc.filter,
            ..Default::default()
        });

        let id = self.next_id;
        self.next_id += 1;
        log::debug!(
            "allocated render target {id}: {}x{} {:?}",
            desc.width,
            desc.height,
            desc.format
        );
        Ok(RenderTarget {
            id,
            desc: *desc,
            texture,
            view,
            sampler,
            needs_clear: true,
        })
    }

    fn reuse(&mut self, _desc: &RenderTargetDesc, target: &mut RenderTarget) {
        target.needs_clear = true;
    }

    fn release(&mut self, _desc: RenderTargetDesc, target: RenderTarget) {
        log::debug!("releasing render target {}", target.id);
        target.texture.destroy();
    }
}

/// Render targets keyed by description.
pub type RenderTargetCache = ResourceCache<RenderTargetDesc, RenderTarget>;

/// Creates a render target cache for `device`.
pub fn render_target_cache(device: Arc<wgpu::Device>, capacity: usize) -> RenderTargetCache {
    ResourceCache::new(capacity, RenderTargetAllocator::new(device))
}
