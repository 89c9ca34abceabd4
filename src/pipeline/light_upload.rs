//! Light upload pass
//!
//! Copies the frame's lights from the persistent staging buffer into a
//! transient storage buffer read by culling and shading.

use crate::backend::{BufferDescriptor, BufferUsage};
use crate::frame_graph::{BufferId, FrameGraphBuilder, FrameGraphResult, PassType};
use crate::scene::GpuLightData;

pub const LIGHT_UPLOAD_PASS: &str = "light_upload";

/// Bytes needed for `max_lights` lights. Never zero, so the buffer is valid
/// even when the limit is tiny.
pub fn light_buffer_size(max_lights: usize) -> u64 {
    ((max_lights * std::mem::size_of::<GpuLightData>()) as u64).max(64)
}

#[derive(Debug, Default)]
pub struct LightUploadData {
    pub staging: BufferId,
    pub light_buffer: BufferId,
    pub copy_size: u64,
}

/// Returns the light buffer.
pub fn add_light_upload_pass(
    builder: &mut FrameGraphBuilder,
    staging: BufferId,
    max_lights: usize,
    light_count: usize,
) -> FrameGraphResult<BufferId> {
    let data = builder.add_pass_with_type::<LightUploadData, _, _>(
        LIGHT_UPLOAD_PASS,
        PassType::Transfer,
        |pass, data| {
            data.staging = pass.read(staging)?;
            data.light_buffer = pass.create_buffer(
                "light_buffer",
                BufferDescriptor::new(
                    light_buffer_size(max_lights),
                    BufferUsage::STORAGE | BufferUsage::COPY_DST,
                ),
            )?;
            data.copy_size = (light_count * std::mem::size_of::<GpuLightData>()) as u64;
            Ok(())
        },
        |data, resources, recorder| {
            if data.copy_size == 0 {
                return Ok(());
            }
            let src = resources.buffer(data.staging)?;
            let dst = resources.buffer(data.light_buffer)?;
            recorder.copy_buffer(src, dst, data.copy_size);
            Ok(())
        },
    )?;
    Ok(data.light_buffer)
}
