//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It keeps the
//! descriptors of every live object so tests can check what the frame graph
//! allocated, and it can be told to fail allocations.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::traits::{BackendError, BackendResult, BufferHandle, GraphicsBackend, TextureHandle};
use super::types::{BufferDescriptor, TextureDescriptor};

#[derive(Debug, Default)]
struct DummyState {
    next_id: u64,
    textures: HashMap<u64, TextureDescriptor>,
    buffers: HashMap<u64, BufferDescriptor>,
    textures_created: usize,
    buffers_created: usize,
    textures_destroyed: usize,
    buffers_destroyed: usize,
    /// Number of upcoming allocations that succeed before failures start.
    fail_after: Option<usize>,
}

impl DummyState {
    fn allocate_id(&mut self) -> BackendResult<u64> {
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(BackendError::OutOfMemory);
            }
            *remaining -= 1;
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every allocation after the next `count` fail with `OutOfMemory`.
    pub fn fail_allocations_after(&self, count: usize) {
        self.state.lock().fail_after = Some(count);
    }

    /// Stop injecting allocation failures.
    pub fn clear_failures(&self) {
        self.state.lock().fail_after = None;
    }

    pub fn live_texture_count(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }

    pub fn textures_created(&self) -> usize {
        self.state.lock().textures_created
    }

    pub fn buffers_created(&self) -> usize {
        self.state.lock().buffers_created
    }

    pub fn textures_destroyed(&self) -> usize {
        self.state.lock().textures_destroyed
    }

    pub fn buffers_destroyed(&self) -> usize {
        self.state.lock().buffers_destroyed
    }
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        let mut state = self.state.lock();
        let id = state.allocate_id().map_err(|err| {
            log::trace!("DummyBackend: texture {:?} allocation failed", desc.label);
            err
        })?;
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}x{}, {} samples)",
            desc.label,
            desc.width,
            desc.height,
            desc.depth,
            desc.sample_count
        );
        state.textures.insert(id, desc.clone());
        state.textures_created += 1;
        Ok(TextureHandle(id))
    }

    fn destroy_texture(&self, texture: TextureHandle) -> BackendResult<()> {
        let mut state = self.state.lock();
        match state.textures.remove(&texture.0) {
            Some(desc) => {
                log::trace!("DummyBackend: destroying texture {:?}", desc.label);
                state.textures_destroyed += 1;
                Ok(())
            }
            None => Err(BackendError::UnknownTexture(texture)),
        }
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let mut state = self.state.lock();
        let id = state.allocate_id()?;
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        state.buffers.insert(id, desc.clone());
        state.buffers_created += 1;
        Ok(BufferHandle(id))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) -> BackendResult<()> {
        let mut state = self.state.lock();
        match state.buffers.remove(&buffer.0) {
            Some(desc) => {
                log::trace!("DummyBackend: destroying buffer {:?}", desc.label);
                state.buffers_destroyed += 1;
                Ok(())
            }
            None => Err(BackendError::UnknownBuffer(buffer)),
        }
    }

    fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.state.lock().textures.get(&texture.0).cloned()
    }

    fn buffer_descriptor(&self, buffer: BufferHandle) -> Option<BufferDescriptor> {
        self.state.lock().buffers.get(&buffer.0).cloned()
    }
}
