//! Shared helpers for integration tests
#![allow(dead_code)]

use frame_graph_engine::backend::{
    BufferDescriptor, BufferUsage, TextureDescriptor, TextureFormat, TextureUsage,
};
use frame_graph_engine::frame_graph::{FrameGraphBuilder, FramePassBuilder, FrameGraphResult};

/// Initialize logging for test output
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn color_desc() -> TextureDescriptor {
    TextureDescriptor::render_target(256, 128, TextureFormat::Rgba16Float)
}

pub fn depth_desc() -> TextureDescriptor {
    TextureDescriptor::render_target(256, 128, TextureFormat::Depth32Float)
}

pub fn backbuffer_desc() -> TextureDescriptor {
    TextureDescriptor::render_target(256, 128, TextureFormat::Bgra8UnormSrgb)
        .with_usage(TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC)
}

pub fn storage_buffer(size: u64) -> BufferDescriptor {
    BufferDescriptor::new(size, BufferUsage::STORAGE | BufferUsage::COPY_DST)
}

/// Add a graphics pass whose execute callback records nothing.
pub fn add_simple_pass<F>(
    builder: &mut FrameGraphBuilder,
    name: &str,
    build: F,
) -> FrameGraphResult<()>
where
    F: FnOnce(&mut FramePassBuilder) -> FrameGraphResult<()>,
{
    builder
        .add_pass::<(), _, _>(name, |pass, _| build(pass), |_, _, _| Ok(()))
        .map(|_| ())
}
