//! Frames in flight.
//!
//! One compiled graph per in-flight slot. A slot's previous graph is retired
//! when a new graph takes its place, by which point the caller has waited
//! for that slot's GPU work.

use crate::backend::GraphicsBackend;
use crate::frame_graph::command::CommandRecorder;
use crate::frame_graph::context::FrameGraphContext;
use crate::frame_graph::error::FrameGraphResult;
use crate::frame_graph::graph::FrameGraph;

#[derive(Debug)]
pub struct FrameGraphRing {
    slots: Vec<Option<FrameGraph>>,
    current: usize,
}

impl FrameGraphRing {
    /// `frames_in_flight` is clamped to at least one.
    pub fn new(frames_in_flight: usize) -> Self {
        let count = frames_in_flight.max(1);
        Self {
            slots: (0..count).map(|_| None).collect(),
            current: 0,
        }
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next frame will use
    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub fn slot(&self, index: usize) -> Option<&FrameGraph> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of slots holding a graph
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Retire the current slot's graph, execute `graph` and store it there.
    ///
    /// The slot advances and the frame index increments even when execution
    /// fails, so the render loop can skip submission and carry on.
    pub fn execute<B: GraphicsBackend + ?Sized>(
        &mut self,
        ctx: &mut FrameGraphContext,
        mut graph: FrameGraph,
        backend: &B,
        recorder: &mut dyn CommandRecorder,
    ) -> FrameGraphResult<()> {
        let slot = self.current;
        if let Some(mut previous) = self.slots[slot].take() {
            previous.release(backend)?;
        }

        let result = graph.execute(backend, recorder);
        if let Err(err) = &result {
            log::error!(
                "Frame {} (slot {}) failed: {}",
                ctx.frame_index(),
                slot,
                err
            );
        }

        self.slots[slot] = Some(graph);
        self.current = (slot + 1) % self.slots.len();
        ctx.advance_frame();
        result
    }

    /// Retire every slot, e.g. on shutdown or resize.
    pub fn retire_all<B: GraphicsBackend + ?Sized>(&mut self, backend: &B) -> FrameGraphResult<()> {
        for slot in &mut self.slots {
            if let Some(mut graph) = slot.take() {
                graph.release(backend)?;
            }
        }
        self.current = 0;
        Ok(())
    }
}
