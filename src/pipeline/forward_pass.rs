//! Forward+ shading pass
//!
//! Shades every draw into the HDR target using the tile light lists and
//! the shadow map. Depth comes from the prepass and is only tested here.

use crate::backend::{TextureDescriptor, TextureUsage};
use crate::frame_graph::{
    BufferId, FrameGraphBuilder, FrameGraphResult, TextureId, TextureSize,
};
use crate::pipeline::PipelineConfig;
use crate::scene::{CameraUniformData, DrawItem};

pub const FORWARD_PASS: &str = "forward";

/// Name of the shaded color target; multisampled targets get a suffix.
pub fn color_target_name(msaa_samples: u32) -> &'static str {
    if msaa_samples > 1 {
        "hdr_color_msaa"
    } else {
        "hdr_color"
    }
}

/// Resources the forward pass consumes
#[derive(Debug, Clone, Copy)]
pub struct ForwardInputs {
    pub depth: TextureId,
    pub shadow_map: TextureId,
    pub light_buffer: BufferId,
    pub tile_buffer: BufferId,
    pub camera: CameraUniformData,
}

#[derive(Debug, Default)]
pub struct ForwardPassData {
    pub color: TextureId,
    pub depth: TextureId,
    pub shadow_map: TextureId,
    pub light_buffer: BufferId,
    pub tile_buffer: BufferId,
    pub camera: CameraUniformData,
    pub draws: Vec<DrawItem>,
}

#[derive(Debug, Clone, Copy)]
pub struct ForwardOutput {
    pub color: TextureId,
    pub depth: TextureId,
}

pub fn add_forward_pass(
    builder: &mut FrameGraphBuilder,
    config: &PipelineConfig,
    inputs: ForwardInputs,
    draws: &[DrawItem],
) -> FrameGraphResult<ForwardOutput> {
    let samples = config.msaa_samples;
    let format = config.hdr_format;
    let data = builder.add_pass::<ForwardPassData, _, _>(
        FORWARD_PASS,
        |pass, data| {
            let usage = if samples > 1 {
                TextureUsage::RENDER_ATTACHMENT
            } else {
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING
            };
            data.color = pass.create_texture_sized(
                color_target_name(samples),
                TextureSize::FULL_FRAME,
                TextureDescriptor {
                    format,
                    sample_count: samples,
                    usage,
                    ..Default::default()
                },
            )?;
            data.depth = pass.read(inputs.depth)?;
            data.shadow_map = pass.sample(inputs.shadow_map)?;
            data.light_buffer = pass.read(inputs.light_buffer)?;
            data.tile_buffer = pass.read(inputs.tile_buffer)?;
            data.camera = inputs.camera;
            data.draws = draws.to_vec();
            Ok(())
        },
        |data, resources, recorder| {
            resources.texture(data.color)?;
            resources.texture(data.depth)?;
            resources.texture(data.shadow_map)?;
            resources.buffer(data.light_buffer)?;
            resources.buffer(data.tile_buffer)?;
            for draw in &data.draws {
                recorder.draw(draw.vertex_count, 1);
            }
            Ok(())
        },
    )?;
    Ok(ForwardOutput {
        color: data.color,
        depth: data.depth,
    })
}
