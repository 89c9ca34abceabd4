//! Main engine orchestrator
//!
//! Ties the ECS tick to the frame graph: every [`Engine::render_frame`] runs
//! the scene schedule, builds and compiles a fresh graph from the collected
//! draw data, and hands it to the frames-in-flight ring for execution.

use bevy_ecs::prelude::*;

use crate::backend::{
    BufferDescriptor, BufferHandle, BufferUsage, GraphicsBackend, TextureDescriptor,
    TextureFormat, TextureHandle, TextureUsage,
};
use crate::frame_graph::{
    CommandRecorder, CompileStats, FrameGraphBuilder, FrameGraphContext, FrameGraphError,
    FrameGraphResult, FrameGraphRing,
};
use crate::pipeline::{self, light_upload, FrameInputs, FrameTargets, PipelineConfig};
use crate::scene::{self, Camera, DrawList, FrameCamera, LightList};
use crate::EngineConfig;

pub const BACKBUFFER_FORMAT: TextureFormat = TextureFormat::Bgra8UnormSrgb;

/// Engine-owned objects the graph imports each frame
struct PersistentTargets {
    backbuffers: Vec<TextureHandle>,
    backbuffer_desc: TextureDescriptor,
    light_staging: BufferHandle,
    light_staging_desc: BufferDescriptor,
}

impl PersistentTargets {
    fn create<B: GraphicsBackend + ?Sized>(
        backend: &B,
        config: &EngineConfig,
    ) -> FrameGraphResult<Self> {
        let backbuffer_desc =
            TextureDescriptor::render_target(config.width, config.height, BACKBUFFER_FORMAT)
                .with_usage(TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC);
        let light_staging_desc = BufferDescriptor::new(
            light_upload::light_buffer_size(config.max_lights),
            BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC,
        )
        .with_label("light_staging");

        let light_staging = backend.create_buffer(&light_staging_desc)?;
        let mut targets = Self {
            backbuffers: Vec::with_capacity(config.frames_in_flight),
            backbuffer_desc,
            light_staging,
            light_staging_desc,
        };
        for index in 0..config.frames_in_flight {
            let desc = targets
                .backbuffer_desc
                .clone()
                .with_label(format!("{}[{}]", config.backbuffer_name, index));
            match backend.create_texture(&desc) {
                Ok(texture) => targets.backbuffers.push(texture),
                Err(err) => {
                    targets.destroy(backend);
                    return Err(err.into());
                }
            }
        }
        Ok(targets)
    }

    fn destroy<B: GraphicsBackend + ?Sized>(&mut self, backend: &B) {
        for texture in self.backbuffers.drain(..) {
            if let Err(err) = backend.destroy_texture(texture) {
                log::warn!("Failed to destroy backbuffer: {}", err);
            }
        }
        if let Err(err) = backend.destroy_buffer(self.light_staging) {
            log::warn!("Failed to destroy light staging buffer: {}", err);
        }
    }
}

/// The main engine struct
pub struct Engine<B: GraphicsBackend> {
    backend: B,
    config: EngineConfig,
    world: World,
    schedule: Schedule,
    context: FrameGraphContext,
    ring: FrameGraphRing,
    targets: Option<PersistentTargets>,
}

impl<B: GraphicsBackend> Engine<B> {
    pub fn new(backend: B, config: EngineConfig) -> FrameGraphResult<Self> {
        let config = config.normalized();
        let targets = PersistentTargets::create(&backend, &config)?;

        let mut world = World::new();
        scene::init_scene_resources(&mut world, config.max_lights);

        log::info!(
            "Engine initialized on '{}' ({}x{}, {} frames in flight)",
            backend.name(),
            config.width,
            config.height,
            config.frames_in_flight
        );

        Ok(Self {
            ring: FrameGraphRing::new(config.frames_in_flight),
            backend,
            config,
            world,
            schedule: scene::scene_schedule(),
            context: FrameGraphContext::new(),
            targets: Some(targets),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn context(&self) -> &FrameGraphContext {
        &self.context
    }

    pub fn ring(&self) -> &FrameGraphRing {
        &self.ring
    }

    /// Run the scene systems, then build, compile and execute this frame's graph.
    pub fn render_frame(
        &mut self,
        recorder: &mut dyn CommandRecorder,
    ) -> FrameGraphResult<CompileStats> {
        self.schedule.run(&mut self.world);

        let inputs = FrameInputs {
            draws: self.world.resource::<DrawList>().items.clone(),
            light_count: self.world.resource::<LightList>().lights.len(),
            camera: self.world.resource::<FrameCamera>().0,
        };
        let frame_targets = self.frame_targets()?;
        let pipeline_config = PipelineConfig::from(&self.config);

        let mut builder = FrameGraphBuilder::new(&mut self.context)
            .with_frame_size(self.config.width, self.config.height);
        pipeline::build_frame_graph(&mut builder, &pipeline_config, &inputs, &frame_targets)?;
        let graph = builder.compile(&mut self.context)?;
        let stats = *graph.stats();

        self.ring
            .execute(&mut self.context, graph, &self.backend, recorder)?;
        Ok(stats)
    }

    fn frame_targets(&self) -> FrameGraphResult<FrameTargets> {
        let missing = || FrameGraphError::RetainedObjectMissing {
            name: self.config.backbuffer_name.clone(),
        };
        let targets = self.targets.as_ref().ok_or_else(missing)?;
        let backbuffer = targets
            .backbuffers
            .get(self.ring.current_slot())
            .copied()
            .ok_or_else(missing)?;
        Ok(FrameTargets {
            backbuffer_name: self.config.backbuffer_name.clone(),
            backbuffer,
            backbuffer_desc: targets.backbuffer_desc.clone(),
            light_staging: targets.light_staging,
            light_staging_desc: targets.light_staging_desc.clone(),
        })
    }

    /// Retire in-flight frames and recreate the size-dependent targets.
    pub fn resize(&mut self, width: u32, height: u32) -> FrameGraphResult<()> {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.config.width, self.config.height) {
            return Ok(());
        }
        log::info!("Resizing to {}x{}", width, height);

        self.ring.retire_all(&self.backend)?;
        if let Some(mut targets) = self.targets.take() {
            targets.destroy(&self.backend);
        }
        self.config.width = width;
        self.config.height = height;
        self.targets = Some(PersistentTargets::create(&self.backend, &self.config)?);

        let mut cameras = self.world.query::<&mut Camera>();
        for mut camera in cameras.iter_mut(&mut self.world) {
            camera.projection.set_aspect(width, height);
        }
        Ok(())
    }

    /// Retire every frame and free engine-owned objects.
    pub fn shutdown(&mut self) -> FrameGraphResult<()> {
        self.ring.retire_all(&self.backend)?;
        if let Some(mut targets) = self.targets.take() {
            targets.destroy(&self.backend);
            log::info!("Engine shut down after {} frames", self.context.frame_index());
        }
        Ok(())
    }
}

impl<B: GraphicsBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("Engine shutdown failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::frame_graph::RecordingCommandList;

    #[test]
    fn test_engine_frame_and_shutdown() {
        let mut engine = Engine::new(DummyBackend::new(), EngineConfig::default()).unwrap();
        assert_eq!(engine.backend().live_texture_count(), 2);

        let mut recorder = RecordingCommandList::new();
        let stats = engine.render_frame(&mut recorder).unwrap();
        assert!(stats.scheduled_passes > 0);
        assert_eq!(engine.context().frame_index(), 1);

        engine.shutdown().unwrap();
        assert_eq!(engine.backend().live_texture_count(), 0);
        assert_eq!(engine.backend().live_buffer_count(), 0);
    }

    #[test]
    fn test_resize_recreates_backbuffers() {
        let mut engine = Engine::new(DummyBackend::new(), EngineConfig::default()).unwrap();
        let mut recorder = RecordingCommandList::new();
        engine.render_frame(&mut recorder).unwrap();

        engine.resize(640, 480).unwrap();
        assert_eq!(engine.ring().occupied(), 0);
        assert_eq!(engine.backend().live_texture_count(), 2);
        assert_eq!(engine.config().width, 640);
    }
}
