//! Tonemapping post-processing

use crate::frame_graph::{FrameGraphBuilder, FrameGraphResult, TextureId};

pub const TONEMAPPING_PASS: &str = "tonemapping";

/// Tonemapping operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TonemapOperator {
    Reinhard,
    #[default]
    Aces,
    None,
}

#[derive(Debug, Default)]
pub struct TonemappingData {
    pub source: TextureId,
    pub output: TextureId,
    pub operator: TonemapOperator,
    pub exposure: f32,
}

/// Map HDR color into the backbuffer with a fullscreen triangle.
/// Returns the new backbuffer version.
pub fn add_tonemapping_pass(
    builder: &mut FrameGraphBuilder,
    source: TextureId,
    backbuffer: TextureId,
) -> FrameGraphResult<TextureId> {
    let data = builder.add_pass::<TonemappingData, _, _>(
        TONEMAPPING_PASS,
        |pass, data| {
            data.source = pass.sample(source)?;
            data.output = pass.write(backbuffer)?;
            data.operator = TonemapOperator::Aces;
            data.exposure = 1.0;
            Ok(())
        },
        |data, resources, recorder| {
            resources.texture(data.source)?;
            resources.texture(data.output)?;
            recorder.draw(3, 1);
            Ok(())
        },
    )?;
    Ok(data.output)
}
