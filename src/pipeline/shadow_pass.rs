//! Shadow map pass

use crate::backend::{TextureDescriptor, TextureFormat, TextureUsage};
use crate::frame_graph::{FrameGraphBuilder, FrameGraphResult, TextureId, TextureSize};
use crate::scene::DrawItem;

pub const SHADOW_PASS: &str = "shadow";

#[derive(Debug, Default)]
pub struct ShadowPassData {
    pub shadow_map: TextureId,
    pub casters: Vec<DrawItem>,
}

/// Render every shadow caster into a square depth map. Returns the map.
pub fn add_shadow_pass(
    builder: &mut FrameGraphBuilder,
    size: u32,
    draws: &[DrawItem],
) -> FrameGraphResult<TextureId> {
    let data = builder.add_pass::<ShadowPassData, _, _>(
        SHADOW_PASS,
        |pass, data| {
            data.shadow_map = pass.create_texture_sized(
                "shadow_map",
                TextureSize::Absolute {
                    width: size,
                    height: size,
                },
                TextureDescriptor {
                    format: TextureFormat::Depth32Float,
                    usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
                    ..Default::default()
                },
            )?;
            data.casters = draws.iter().filter(|draw| draw.casts_shadows).copied().collect();
            Ok(())
        },
        |data, resources, recorder| {
            resources.texture(data.shadow_map)?;
            for caster in &data.casters {
                recorder.draw(caster.vertex_count, 1);
            }
            Ok(())
        },
    )?;
    Ok(data.shadow_map)
}
