//! Frame graph builder

use crate::backend::{BufferDescriptor, BufferHandle, TextureDescriptor, TextureHandle};
use crate::frame_graph::command::CommandRecorder;
use crate::frame_graph::compiler;
use crate::frame_graph::context::FrameGraphContext;
use crate::frame_graph::error::{FrameGraphError, FrameGraphResult};
use crate::frame_graph::graph::FrameGraph;
use crate::frame_graph::pass::{
    ExecutablePass, FramePass, FramePassBase, FrameGraphResources, PassId, PassType,
};
use crate::frame_graph::pass_builder::FramePassBuilder;
use crate::frame_graph::registry::ResourceRegistry;
use crate::frame_graph::{BufferId, TextureId};

/// Accumulates passes and resources for one compilation cycle.
///
/// The first declaration error poisons the builder: later `add_pass` calls
/// and `compile` return that error.
pub struct FrameGraphBuilder {
    serial: u64,
    backbuffer_name: Option<String>,
    frame_size: (u32, u32),
    registry: ResourceRegistry,
    passes: Vec<Box<dyn ExecutablePass>>,
    error: Option<FrameGraphError>,
}

impl FrameGraphBuilder {
    pub fn new(ctx: &mut FrameGraphContext) -> Self {
        let serial = ctx.allocate_serial();
        Self {
            serial,
            backbuffer_name: None,
            frame_size: (1, 1),
            registry: ResourceRegistry::new(serial),
            passes: Vec::new(),
            error: None,
        }
    }

    /// Size used to resolve relative texture sizes
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width.max(1), height.max(1));
        self
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Name of the resource that roots culling.
    pub fn set_backbuffer_name(&mut self, name: impl Into<String>) {
        self.backbuffer_name = Some(name.into());
    }

    pub fn backbuffer_name(&self) -> Option<&str> {
        self.backbuffer_name.as_deref()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    fn track<T>(&mut self, result: FrameGraphResult<T>) -> FrameGraphResult<T> {
        if let Err(err) = &result {
            if self.error.is_none() {
                self.error = Some(err.clone());
            }
        }
        result
    }

    fn check_poisoned(&self) -> FrameGraphResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn add_transient_texture(
        &mut self,
        name: &str,
        desc: TextureDescriptor,
    ) -> FrameGraphResult<TextureId> {
        let result = self.registry.add_transient_texture(name, desc);
        self.track(result)
    }

    pub fn add_transient_buffer(
        &mut self,
        name: &str,
        desc: BufferDescriptor,
    ) -> FrameGraphResult<BufferId> {
        let result = self.registry.add_transient_buffer(name, desc);
        self.track(result)
    }

    /// Import an externally owned texture. It is never derealized by the graph.
    pub fn set_retained_texture(
        &mut self,
        name: &str,
        desc: TextureDescriptor,
        texture: TextureHandle,
    ) -> FrameGraphResult<TextureId> {
        let result = self.registry.set_retained_texture(name, desc, texture);
        self.track(result)
    }

    /// Import an externally owned buffer. It is never derealized by the graph.
    pub fn set_retained_buffer(
        &mut self,
        name: &str,
        desc: BufferDescriptor,
        buffer: BufferHandle,
    ) -> FrameGraphResult<BufferId> {
        let result = self.registry.set_retained_buffer(name, desc, buffer);
        self.track(result)
    }

    /// Add a graphics pass. `build` runs immediately; `execute` runs when the
    /// compiled graph executes. Returns the data `build` filled in.
    pub fn add_pass<Data, Build, Execute>(
        &mut self,
        name: &str,
        build: Build,
        execute: Execute,
    ) -> FrameGraphResult<&Data>
    where
        Data: Default + 'static,
        Build: FnOnce(&mut FramePassBuilder, &mut Data) -> FrameGraphResult<()>,
        Execute: FnOnce(
                &Data,
                &FrameGraphResources,
                &mut dyn CommandRecorder,
            ) -> FrameGraphResult<()>
            + 'static,
    {
        self.add_pass_with_type(name, PassType::Graphics, build, execute)
    }

    pub fn add_pass_with_type<Data, Build, Execute>(
        &mut self,
        name: &str,
        pass_type: PassType,
        build: Build,
        execute: Execute,
    ) -> FrameGraphResult<&Data>
    where
        Data: Default + 'static,
        Build: FnOnce(&mut FramePassBuilder, &mut Data) -> FrameGraphResult<()>,
        Execute: FnOnce(
                &Data,
                &FrameGraphResources,
                &mut dyn CommandRecorder,
            ) -> FrameGraphResult<()>
            + 'static,
    {
        self.check_poisoned()?;

        let id = PassId(self.passes.len() as u32);
        let mut base = FramePassBase::new(name, id, pass_type);
        let mut data = Data::default();
        let result = {
            let mut builder = FramePassBuilder::new(
                &mut self.registry,
                &mut base,
                &self.passes,
                self.frame_size,
            );
            build(&mut builder, &mut data)
        };
        if let Err(err) = result {
            log::error!("Failed to build pass '{}': {}", name, err);
            return self.track(Err(err));
        }

        self.passes
            .push(Box::new(FramePass::new(base, data, Box::new(execute))));

        self.passes
            .last()
            .and_then(|pass| pass.as_any().downcast_ref::<FramePass<Data>>())
            .map(FramePass::data)
            .ok_or_else(|| FrameGraphError::PassFailed {
                pass: name.to_string(),
                reason: "pass data has an unexpected type".to_string(),
            })
    }

    /// Data of the first pass called `name`, if it has type `Data`.
    pub fn pass_data<Data: 'static>(&self, name: &str) -> Option<&Data> {
        self.passes
            .iter()
            .find(|pass| pass.base().name == name)
            .and_then(|pass| pass.as_any().downcast_ref::<FramePass<Data>>())
            .map(FramePass::data)
    }

    /// Order passes, cull dead ones and plan resource lifetimes.
    pub fn compile(self, ctx: &mut FrameGraphContext) -> FrameGraphResult<FrameGraph> {
        self.check_poisoned()?;

        let plan = compiler::compile(
            &self.passes,
            &self.registry,
            self.backbuffer_name.as_deref(),
        )
        .map_err(|err| {
            log::error!("Frame graph {} failed to compile: {}", self.serial, err);
            err
        })?;

        let stats = plan.stats;
        log::debug!(
            "Compiled frame graph {}: {} passes scheduled, {} culled, {} transients, {} barriers",
            self.serial,
            stats.scheduled_passes,
            stats.culled_passes,
            stats.transient_resources,
            stats.barriers
        );
        ctx.record_compile(stats);

        Ok(FrameGraph::new(self.serial, self.registry, self.passes, plan))
    }
}
