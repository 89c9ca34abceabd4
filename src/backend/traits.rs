//! Core backend abstraction traits
//!
//! The frame graph only needs a backend to allocate and free textures and
//! buffers. Command recording goes through [`crate::frame_graph::CommandRecorder`].

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),
    #[error("Unknown buffer handle {0:?}")]
    UnknownBuffer(BufferHandle),
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

impl BufferHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

impl TextureHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Main graphics backend trait
///
/// Methods take `&self` so a backend can be shared between the engine and
/// whatever owns retained resources; implementations synchronize internally.
pub trait GraphicsBackend: Send + Sync {
    /// Backend name used in log output
    fn name(&self) -> &'static str;

    /// Create a texture
    fn create_texture(&self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Destroy a texture
    fn destroy_texture(&self, texture: TextureHandle) -> BackendResult<()>;

    /// Create a buffer
    fn create_buffer(&self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    /// Destroy a buffer
    fn destroy_buffer(&self, buffer: BufferHandle) -> BackendResult<()>;

    /// Real properties of a live texture
    fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor>;

    /// Real properties of a live buffer
    fn buffer_descriptor(&self, buffer: BufferHandle) -> Option<BufferDescriptor>;
}
