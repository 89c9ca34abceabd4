//! Tiled light culling (Forward+)
//!
//! A compute pass splits the screen into tiles and writes, for each tile,
//! the indices of the lights that can touch it.

use bytemuck::{Pod, Zeroable};

use crate::backend::{BufferDescriptor, BufferUsage};
use crate::frame_graph::{BufferId, FrameGraphBuilder, FrameGraphResult, PassType, TextureId};
use crate::pipeline::PipelineConfig;

pub const LIGHT_CULLING_PASS: &str = "light_culling";

/// Tile edge in pixels
pub const TILE_SIZE: u32 = 16;

/// Maximum lights recorded per tile
pub const MAX_LIGHTS_PER_TILE: usize = 256;

/// Per-tile light list as laid out in the tile buffer
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct TileLightData {
    pub light_count: u32,
    pub light_indices: [u32; MAX_LIGHTS_PER_TILE],
}

/// Number of tiles covering `width` x `height`.
pub fn tile_count(width: u32, height: u32, tile_size: u32) -> (u32, u32) {
    let tile_size = tile_size.max(1);
    (width.div_ceil(tile_size), height.div_ceil(tile_size))
}

#[derive(Debug, Default)]
pub struct LightCullingData {
    pub depth: TextureId,
    pub light_buffer: BufferId,
    pub tile_buffer: BufferId,
    pub tiles: (u32, u32),
    pub light_count: usize,
}

/// Resources produced by light culling
#[derive(Debug, Clone, Copy)]
pub struct LightCullingOutput {
    pub tile_buffer: BufferId,
    pub tiles: (u32, u32),
}

pub fn add_light_culling_pass(
    builder: &mut FrameGraphBuilder,
    config: &PipelineConfig,
    depth: TextureId,
    light_buffer: BufferId,
    light_count: usize,
) -> FrameGraphResult<LightCullingOutput> {
    let tiles = tile_count(config.width, config.height, TILE_SIZE);
    let tile_bytes =
        (tiles.0 as u64 * tiles.1 as u64) * std::mem::size_of::<TileLightData>() as u64;

    let data = builder.add_pass_with_type::<LightCullingData, _, _>(
        LIGHT_CULLING_PASS,
        PassType::Compute,
        |pass, data| {
            data.depth = pass.read(depth)?;
            data.light_buffer = pass.read(light_buffer)?;
            data.tile_buffer = pass.create_buffer(
                "tile_light_buffer",
                BufferDescriptor::new(tile_bytes, BufferUsage::STORAGE),
            )?;
            data.tiles = tiles;
            data.light_count = light_count;
            Ok(())
        },
        |data, resources, recorder| {
            resources.texture(data.depth)?;
            resources.buffer(data.light_buffer)?;
            resources.buffer(data.tile_buffer)?;
            recorder.dispatch(data.tiles.0, data.tiles.1, 1);
            Ok(())
        },
    )?;
    Ok(LightCullingOutput {
        tile_buffer: data.tile_buffer,
        tiles: data.tiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_count_rounds_up() {
        assert_eq!(tile_count(1920, 1080, 16), (120, 68));
        assert_eq!(tile_count(1, 1, 16), (1, 1));
        assert_eq!(tile_count(17, 32, 16), (2, 2));
    }

    #[test]
    fn test_tile_light_data_layout() {
        assert_eq!(
            std::mem::size_of::<TileLightData>(),
            4 * (1 + MAX_LIGHTS_PER_TILE)
        );
    }
}
