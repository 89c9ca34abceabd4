//! MSAA resolve

use crate::backend::{TextureDescriptor, TextureUsage};
use crate::frame_graph::{FrameGraphBuilder, FrameGraphResult, TextureId, TextureSize};
use crate::pipeline::PipelineConfig;

pub const RESOLVE_PASS: &str = "msaa_resolve";

#[derive(Debug, Default)]
pub struct ResolvePassData {
    pub source: TextureId,
    pub target: TextureId,
}

/// Resolve the multisampled HDR target into a sampleable `hdr_color`.
pub fn add_resolve_pass(
    builder: &mut FrameGraphBuilder,
    config: &PipelineConfig,
    source: TextureId,
) -> FrameGraphResult<TextureId> {
    let format = config.hdr_format;
    let data = builder.add_pass::<ResolvePassData, _, _>(
        RESOLVE_PASS,
        |pass, data| {
            data.source = pass.read(source)?;
            let target = pass.create_texture_sized(
                "hdr_color",
                TextureSize::FULL_FRAME,
                TextureDescriptor {
                    format,
                    usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
                    ..Default::default()
                },
            )?;
            data.target = pass.resolve(target)?;
            Ok(())
        },
        |data, resources, recorder| {
            let source = resources.texture(data.source)?;
            let target = resources.texture(data.target)?;
            recorder.copy_texture(source, target);
            Ok(())
        },
    )?;
    Ok(data.target)
}
