//! Compiled, executable frame graph

use std::collections::HashMap;

use crate::backend::GraphicsBackend;
use crate::frame_graph::command::CommandRecorder;
use crate::frame_graph::compiler::{AliasSlot, CompileStats, CompiledPlan, CompiledStep};
use crate::frame_graph::error::{FrameGraphError, FrameGraphResult};
use crate::frame_graph::handle::ResourceId;
use crate::frame_graph::pass::{ExecutablePass, FramePass, PassId};
use crate::frame_graph::registry::ResourceRegistry;
use crate::frame_graph::resource::{FrameGraphResource, ResourceBarrier, ResourceLifetime};

/// The result of [`FrameGraphBuilder::compile`](super::FrameGraphBuilder::compile).
///
/// Holds the ordered schedule, the registry and the passes. A graph executes
/// once; the next frame compiles a fresh one.
pub struct FrameGraph {
    serial: u64,
    registry: ResourceRegistry,
    passes: Vec<Box<dyn ExecutablePass>>,
    steps: Vec<CompiledStep>,
    culled: Vec<PassId>,
    retained: Vec<ResourceId>,
    lifetimes: HashMap<ResourceId, ResourceLifetime>,
    final_barriers: Vec<ResourceBarrier>,
    alias_slots: Vec<AliasSlot>,
    stats: CompileStats,
    executed: bool,
}

impl FrameGraph {
    pub(crate) fn new(
        serial: u64,
        registry: ResourceRegistry,
        passes: Vec<Box<dyn ExecutablePass>>,
        plan: CompiledPlan,
    ) -> Self {
        Self {
            serial,
            registry,
            passes,
            steps: plan.steps,
            culled: plan.culled,
            retained: plan.retained,
            lifetimes: plan.lifetimes,
            final_barriers: plan.final_barriers,
            alias_slots: plan.alias_slots,
            stats: plan.stats,
            executed: false,
        }
    }

    /// Run the schedule: per step realize, barriers, execute callback, derealize.
    ///
    /// On failure the remaining steps are skipped. Transients realized so far
    /// stay owned by the graph until [`FrameGraph::release`].
    pub fn execute<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &B,
        recorder: &mut dyn CommandRecorder,
    ) -> FrameGraphResult<()> {
        if self.executed {
            return Err(FrameGraphError::AlreadyExecuted);
        }
        self.executed = true;

        for id in &self.retained {
            self.registry.realize(*id, backend)?;
        }

        for step in &self.steps {
            for id in &step.realize {
                self.registry.realize(*id, backend)?;
            }
            for barrier in &step.barriers {
                recorder.barrier(barrier);
            }

            let pass = &mut self.passes[step.pass.index()];
            let (name, pass_type) = (pass.base().name.clone(), pass.base().pass_type);
            recorder.begin_pass(&name, pass_type);
            if let Err(err) = pass.execute(&self.registry, recorder) {
                log::error!("Pass '{}' failed: {}", name, err);
                recorder.end_pass();
                return Err(err);
            }
            recorder.end_pass();

            for id in &step.derealize {
                self.registry.derealize(*id, backend)?;
            }
        }

        for barrier in &self.final_barriers {
            recorder.barrier(barrier);
        }

        log::trace!(
            "Executed frame graph {} ({} passes)",
            self.serial,
            self.steps.len()
        );
        Ok(())
    }

    /// Derealize every transient still holding a backing object.
    pub fn release<B: GraphicsBackend + ?Sized>(&mut self, backend: &B) -> FrameGraphResult<usize> {
        let released = self.registry.release_transients(backend)?;
        if released > 0 {
            log::debug!(
                "Released {} leftover transients of frame graph {}",
                released,
                self.serial
            );
        }
        Ok(released)
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// True when no pass survived compilation
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[CompiledStep] {
        &self.steps
    }

    /// Names of scheduled passes in execution order
    pub fn pass_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .map(|step| self.passes[step.pass.index()].base().name.as_str())
            .collect()
    }

    /// Names of culled passes in insertion order
    pub fn culled_pass_names(&self) -> Vec<&str> {
        self.culled
            .iter()
            .map(|id| self.passes[id.index()].base().name.as_str())
            .collect()
    }

    /// Data of the first pass called `name`, if it has type `Data`.
    pub fn pass_data<Data: 'static>(&self, name: &str) -> Option<&Data> {
        self.passes
            .iter()
            .find(|pass| pass.base().name == name)
            .and_then(|pass| pass.as_any().downcast_ref::<FramePass<Data>>())
            .map(FramePass::data)
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn resource(&self, name: &str) -> Option<&FrameGraphResource> {
        self.registry.find(name)
    }

    pub fn lifetime(&self, id: impl Into<ResourceId>) -> Option<ResourceLifetime> {
        self.lifetimes.get(&id.into()).copied()
    }

    /// Whether the resource is in use at the given step index.
    pub fn is_resource_alive(&self, id: impl Into<ResourceId>, step: usize) -> bool {
        self.lifetime(id)
            .is_some_and(|lifetime| lifetime.contains(step))
    }

    /// Retained resources used by scheduled passes
    pub fn retained_resources(&self) -> &[ResourceId] {
        &self.retained
    }

    /// Transitions recorded after the last pass
    pub fn final_barriers(&self) -> &[ResourceBarrier] {
        &self.final_barriers
    }

    pub fn alias_slots(&self) -> &[AliasSlot] {
        &self.alias_slots
    }

    pub fn stats(&self) -> &CompileStats {
        &self.stats
    }
}

impl Drop for FrameGraph {
    fn drop(&mut self) {
        let leaked = self.registry.realized_transient_count();
        if leaked > 0 {
            log::warn!(
                "Frame graph {} dropped with {} realized transients",
                self.serial,
                leaked
            );
        }
    }
}

impl std::fmt::Debug for FrameGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGraph")
            .field("serial", &self.serial)
            .field("passes", &self.pass_names())
            .field("culled", &self.culled_pass_names())
            .field("executed", &self.executed)
            .finish()
    }
}
