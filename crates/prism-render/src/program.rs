//! Shader programs compiled on demand and cached by name and target format.
//!
//! Every program in the library is a fullscreen pass: the shared vertex
//! stage from `fullscreen.wgsl` plus a fragment stage registered under a
//! name. All programs share one bind group layout:
//!
//! | binding | resource                      |
//! |---------|-------------------------------|
//! | 0       | source texture (filterable)   |
//! | 1       | source sampler                |
//! | 2       | uniform buffer (fragment)     |

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use prism_core::{PrismError, Receipt, ResourceAllocator, ResourceCache};

use crate::error::{RenderError, RenderResult};

const FULLSCREEN_WGSL: &str = include_str!("shaders/fullscreen.wgsl");

/// Name of the built-in separable blur program.
pub const BLUR_PROGRAM: &str = "blur";
/// Name of the built-in copy program.
pub const COPY_PROGRAM: &str = "copy";

/// Cache key for a compiled program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub name: String,
    pub target_format: wgpu::TextureFormat,
}

impl ProgramKey {
    pub fn new(name: impl Into<String>, target_format: wgpu::TextureFormat) -> Self {
        Self {
            name: name.into(),
            target_format,
        }
    }
}

/// Named fragment shader sources.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    sources: HashMap<String, Cow<'static, str>>,
}

impl ShaderLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a library holding the built-in programs.
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        library.register(BLUR_PROGRAM, include_str!("shaders/blur.wgsl"));
        library.register(COPY_PROGRAM, include_str!("shaders/copy.wgsl"));
        library
    }

    /// Registers (or replaces) the fragment source for `name`.
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<Cow<'static, str>>) {
        self.sources.insert(name.into(), source.into());
    }

    /// Returns whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Returns the full WGSL module for `name`, vertex stage included.
    pub fn module_source(&self, name: &str) -> Option<String> {
        self.sources
            .get(name)
            .map(|fragment| format!("{FULLSCREEN_WGSL}\n{fragment}"))
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A compiled fullscreen program.
pub struct Program {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program").finish_non_exhaustive()
    }
}

/// Creates the bind group layout shared by all fullscreen programs.
pub fn fullscreen_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Fullscreen Bind Group Layout"),
        entries: &[
            // Source texture
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            // Sampler
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            // Uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

/// Compiles library programs for a device.
pub struct ProgramAllocator {
    device: Arc<wgpu::Device>,
    library: ShaderLibrary,
}

impl ProgramAllocator {
    pub fn new(device: Arc<wgpu::Device>, library: ShaderLibrary) -> Self {
        Self { device, library }
    }
}

impl ResourceAllocator<ProgramKey, Program> for ProgramAllocator {
    fn allocate(&mut self, key: &ProgramKey) -> prism_core::Result<Program> {
        let source = self.library.module_source(&key.name).ok_or_else(|| {
            PrismError::AllocationFailed(format!("no source for program '{}'", key.name))
        })?;
        let device = &self.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(key.name.as_str()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let bind_group_layout = fullscreen_bind_group_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fullscreen Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key.name.as_str()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(PrismError::AllocationFailed(format!(
                "program '{}' failed to compile: {err}",
                key.name
            )));
        }
        log::debug!("compiled program '{}' for {:?}", key.name, key.target_format);
        Ok(Program {
            pipeline,
            bind_group_layout,
        })
    }
}

/// Compiled programs keyed by name and target format.
pub struct ProgramCache {
    library: ShaderLibrary,
    cache: ResourceCache<ProgramKey, Program>,
}

impl ProgramCache {
    /// Creates a cache compiling programs from `library`.
    pub fn new(device: Arc<wgpu::Device>, library: ShaderLibrary, capacity: usize) -> Self {
        Self {
            cache: ResourceCache::new(capacity, ProgramAllocator::new(device, library.clone())),
            library,
        }
    }

    /// Returns the library programs are compiled from.
    pub fn library(&self) -> &ShaderLibrary {
        &self.library
    }

    /// Returns the underlying cache.
    pub fn cache(&self) -> &ResourceCache<ProgramKey, Program> {
        &self.cache
    }

    /// Borrows the compiled program for `key`, compiling it on first use.
    ///
    /// Fails with [`RenderError::UnknownProgram`] if the library has no
    /// program of that name.
    pub fn checkout(&self, key: &ProgramKey) -> RenderResult<Receipt<'_, ProgramKey, Program>> {
        if !self.library.contains(&key.name) {
            log::error!("requested unknown program '{}'", key.name);
            return Err(RenderError::UnknownProgram(key.name.clone()));
        }
        Ok(self.cache.checkout(key)?)
    }
}

impl std::fmt::Debug for ProgramCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCache")
            .field("programs", &self.library.names())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let library = ShaderLibrary::with_builtins();
        assert_eq!(library.names(), vec![BLUR_PROGRAM, COPY_PROGRAM]);
        assert!(!library.contains("bloom"));
    }

    #[test]
    fn test_module_source_includes_vertex_stage() {
        let library = ShaderLibrary::with_builtins();
        let source = library.module_source(BLUR_PROGRAM).unwrap();
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));
        assert!(library.module_source("missing").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut library = ShaderLibrary::new();
        library.register("tint", "// a");
        library.register("tint", String::from("// b"));
        assert_eq!(library.names(), vec!["tint"]);
        assert!(library.module_source("tint").unwrap().ends_with("// b"));
    }

    #[test]
    fn test_program_keys_distinguish_formats() {
        let a = ProgramKey::new(BLUR_PROGRAM, wgpu::TextureFormat::Rgba8Unorm);
        let b = ProgramKey::new(BLUR_PROGRAM, wgpu::TextureFormat::Rgba16Float);
        assert_ne!(a, b);
        assert_eq!(a, ProgramKey::new("blur", wgpu::TextureFormat::Rgba8Unorm));
    }
}
