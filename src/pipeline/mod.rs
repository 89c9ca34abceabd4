//! Forward+ frame pipeline
//!
//! Builds one frame's graph:
//! 1. Light upload (transfer) - copies the frame's lights into a GPU buffer
//! 2. Shadow pass - renders shadow casters into the shadow map
//! 3. Depth prepass - multisampled scene depth
//! 4. Light culling (compute) - bins lights into screen tiles
//! 5. Forward pass - shades into a multisampled HDR target
//! 6. Resolve + tonemapping - writes the backbuffer
//! 7. Debug overlay (optional) - draws on top of the backbuffer

pub mod debug_overlay;
pub mod depth_prepass;
pub mod forward_pass;
pub mod light_culling;
pub mod light_upload;
pub mod postprocess;
pub mod shadow_pass;

use crate::backend::{
    BufferDescriptor, BufferHandle, TextureDescriptor, TextureFormat, TextureHandle,
};
use crate::frame_graph::{BufferId, FrameGraphBuilder, FrameGraphResult, TextureId};
use crate::scene::{CameraUniformData, DrawItem};
use crate::EngineConfig;

/// Settings the pipeline takes from [`EngineConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    pub msaa_samples: u32,
    pub shadow_map_size: u32,
    pub max_lights: usize,
    pub enable_debug_overlay: bool,
    pub hdr_format: TextureFormat,
}

impl From<&EngineConfig> for PipelineConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            width: config.width.max(1),
            height: config.height.max(1),
            msaa_samples: config.msaa_samples.max(1),
            shadow_map_size: config.shadow_map_size.max(1),
            max_lights: config.max_lights.max(1),
            enable_debug_overlay: config.enable_debug_overlay,
            hdr_format: TextureFormat::Rgba16Float,
        }
    }
}

/// Per-frame data gathered by the scene systems
#[derive(Debug, Clone, Default)]
pub struct FrameInputs {
    pub draws: Vec<DrawItem>,
    pub light_count: usize,
    pub camera: CameraUniformData,
}

/// Externally owned objects the graph imports as retained resources
#[derive(Debug, Clone)]
pub struct FrameTargets {
    pub backbuffer_name: String,
    pub backbuffer: TextureHandle,
    pub backbuffer_desc: TextureDescriptor,
    pub light_staging: BufferHandle,
    pub light_staging_desc: BufferDescriptor,
}

/// Handles of the main resources, for callers adding their own passes
#[derive(Debug, Clone, Copy)]
pub struct PipelineResources {
    pub light_buffer: BufferId,
    pub tile_buffer: BufferId,
    pub shadow_map: TextureId,
    pub depth: TextureId,
    pub hdr_color: TextureId,
    pub backbuffer: TextureId,
}

/// Add every pipeline pass to `builder`.
pub fn build_frame_graph(
    builder: &mut FrameGraphBuilder,
    config: &PipelineConfig,
    inputs: &FrameInputs,
    targets: &FrameTargets,
) -> FrameGraphResult<PipelineResources> {
    builder.set_backbuffer_name(targets.backbuffer_name.as_str());
    let backbuffer = builder.set_retained_texture(
        &targets.backbuffer_name,
        targets.backbuffer_desc.clone(),
        targets.backbuffer,
    )?;
    let staging = builder.set_retained_buffer(
        "light_staging",
        targets.light_staging_desc.clone(),
        targets.light_staging,
    )?;

    let light_count = inputs.light_count.min(config.max_lights);
    let light_buffer =
        light_upload::add_light_upload_pass(builder, staging, config.max_lights, light_count)?;
    let shadow_map = shadow_pass::add_shadow_pass(builder, config.shadow_map_size, &inputs.draws)?;
    let depth = depth_prepass::add_depth_prepass(builder, config, &inputs.draws)?;
    let tiles =
        light_culling::add_light_culling_pass(builder, config, depth, light_buffer, light_count)?;
    let forward = forward_pass::add_forward_pass(
        builder,
        config,
        forward_pass::ForwardInputs {
            depth,
            shadow_map,
            light_buffer,
            tile_buffer: tiles.tile_buffer,
            camera: inputs.camera,
        },
        &inputs.draws,
    )?;
    let hdr_color = if config.msaa_samples > 1 {
        postprocess::add_resolve_pass(builder, config, forward.color)?
    } else {
        forward.color
    };

    let mut backbuffer = postprocess::add_tonemapping_pass(builder, hdr_color, backbuffer)?;
    if config.enable_debug_overlay {
        backbuffer = debug_overlay::add_debug_overlay_pass(builder, backbuffer, &inputs.draws)?;
    }

    Ok(PipelineResources {
        light_buffer,
        tile_buffer: tiles.tile_buffer,
        shadow_map,
        depth: forward.depth,
        hdr_color,
        backbuffer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferUsage, DummyBackend, GraphicsBackend};
    use crate::frame_graph::{FrameGraphContext, ResourceId, ResourceState};

    #[test]
    fn test_pipeline_config_clamps_zero_values() {
        let config = EngineConfig {
            msaa_samples: 0,
            max_lights: 0,
            ..Default::default()
        };
        let pipeline = PipelineConfig::from(&config);
        assert_eq!(pipeline.msaa_samples, 1);
        assert_eq!(pipeline.max_lights, 1);
    }

    fn dummy_targets(backend: &DummyBackend, config: &PipelineConfig) -> FrameTargets {
        let backbuffer_desc = TextureDescriptor::render_target(
            config.width,
            config.height,
            TextureFormat::Bgra8UnormSrgb,
        );
        let staging_desc = BufferDescriptor::new(
            light_upload::light_buffer_size(config.max_lights),
            BufferUsage::COPY_SRC,
        );
        FrameTargets {
            backbuffer_name: "backbuffer".to_string(),
            backbuffer: backend.create_texture(&backbuffer_desc).unwrap(),
            backbuffer_desc,
            light_staging: backend.create_buffer(&staging_desc).unwrap(),
            light_staging_desc: staging_desc,
        }
    }

    #[test]
    fn test_depth_and_resolve_transitions() {
        let backend = DummyBackend::new();
        let config = PipelineConfig::from(&EngineConfig {
            width: 32,
            height: 32,
            ..Default::default()
        });
        let targets = dummy_targets(&backend, &config);

        let mut ctx = FrameGraphContext::new();
        let mut builder = FrameGraphBuilder::new(&mut ctx).with_frame_size(32, 32);
        let resources =
            build_frame_graph(&mut builder, &config, &FrameInputs::default(), &targets).unwrap();
        let graph = builder.compile(&mut ctx).unwrap();

        let states_of = |id: ResourceId| -> Vec<ResourceState> {
            graph
                .steps()
                .iter()
                .flat_map(|step| step.barriers.iter())
                .filter(|barrier| barrier.resource == id)
                .map(|barrier| barrier.to)
                .collect()
        };
        assert_eq!(
            states_of(resources.depth.id()),
            vec![
                ResourceState::DepthStencilAttachment,
                ResourceState::ShaderRead,
                ResourceState::DepthStencilAttachment,
            ]
        );
        assert_eq!(
            states_of(resources.hdr_color.id()),
            vec![ResourceState::ResolveDestination, ResourceState::ShaderRead]
        );
        assert_eq!(graph.final_barriers().len(), 1);
        assert!(graph.culled_pass_names().is_empty());
    }

    #[test]
    fn test_screen_targets_follow_frame_size() {
        let backend = DummyBackend::new();
        let config = PipelineConfig::from(&EngineConfig {
            width: 48,
            height: 24,
            shadow_map_size: 256,
            ..Default::default()
        });
        let targets = dummy_targets(&backend, &config);

        let mut ctx = FrameGraphContext::new();
        let mut builder = FrameGraphBuilder::new(&mut ctx).with_frame_size(48, 24);
        build_frame_graph(&mut builder, &config, &FrameInputs::default(), &targets).unwrap();
        let graph = builder.compile(&mut ctx).unwrap();

        let extent = |name: &str| {
            let desc = graph
                .resource(name)
                .and_then(|resource| resource.descriptor.as_texture())
                .unwrap();
            (desc.width, desc.height, desc.sample_count)
        };
        assert_eq!(extent("depth"), (48, 24, 4));
        assert_eq!(extent("hdr_color_msaa"), (48, 24, 4));
        assert_eq!(extent("hdr_color"), (48, 24, 1));
        assert_eq!(extent("shadow_map"), (256, 256, 1));
    }
}
