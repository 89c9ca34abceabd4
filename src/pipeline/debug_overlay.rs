//! Debug overlay
//!
//! Draws a bounds box per draw item over the final image.

use crate::frame_graph::{FrameGraphBuilder, FrameGraphResult, TextureId};
use crate::scene::DrawItem;

pub const DEBUG_OVERLAY_PASS: &str = "debug_overlay";

/// Line-list vertices for one box
const BOX_VERTICES: u32 = 24;

#[derive(Debug, Default)]
pub struct DebugOverlayData {
    pub target: TextureId,
    pub boxes: u32,
}

pub fn add_debug_overlay_pass(
    builder: &mut FrameGraphBuilder,
    backbuffer: TextureId,
    draws: &[DrawItem],
) -> FrameGraphResult<TextureId> {
    let data = builder.add_pass::<DebugOverlayData, _, _>(
        DEBUG_OVERLAY_PASS,
        |pass, data| {
            data.target = pass.write(backbuffer)?;
            data.boxes = draws.len() as u32;
            Ok(())
        },
        |data, resources, recorder| {
            resources.texture(data.target)?;
            if data.boxes > 0 {
                recorder.draw(BOX_VERTICES, data.boxes);
            }
            Ok(())
        },
    )?;
    Ok(data.target)
}
