//! Rendering error types.

use prism_core::PrismError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// No program with this name is registered in the shader library.
    #[error("unknown shader program '{0}'")]
    UnknownProgram(String),

    /// A pass was given a target format it cannot process.
    #[error("unsupported texture format {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),

    /// Scope, cache or texture unit error from the core.
    #[error(transparent)]
    Core(#[from] PrismError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
