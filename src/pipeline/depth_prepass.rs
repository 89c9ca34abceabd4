//! Depth prepass
//!
//! Lays down scene depth before shading so light culling can bound each
//! tile and the forward pass only shades visible fragments.

use crate::backend::{TextureDescriptor, TextureFormat, TextureUsage};
use crate::frame_graph::{FrameGraphBuilder, FrameGraphResult, TextureId, TextureSize};
use crate::pipeline::PipelineConfig;
use crate::scene::DrawItem;

pub const DEPTH_PREPASS: &str = "depth_prepass";

#[derive(Debug, Default)]
pub struct DepthPrepassData {
    pub depth: TextureId,
    pub vertex_counts: Vec<u32>,
}

pub fn add_depth_prepass(
    builder: &mut FrameGraphBuilder,
    config: &PipelineConfig,
    draws: &[DrawItem],
) -> FrameGraphResult<TextureId> {
    let samples = config.msaa_samples;
    let data = builder.add_pass::<DepthPrepassData, _, _>(
        DEPTH_PREPASS,
        |pass, data| {
            let desc = TextureDescriptor {
                format: TextureFormat::Depth32Float,
                sample_count: samples,
                usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
                ..Default::default()
            };
            data.depth = pass.create_texture_sized("depth", TextureSize::FULL_FRAME, desc)?;
            data.vertex_counts = draws.iter().map(|draw| draw.vertex_count).collect();
            Ok(())
        },
        |data, resources, recorder| {
            resources.texture(data.depth)?;
            for &vertex_count in &data.vertex_counts {
                recorder.draw(vertex_count, 1);
            }
            Ok(())
        },
    )?;
    Ok(data.depth)
}
