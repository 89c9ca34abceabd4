//! Per-engine frame graph state

use crate::frame_graph::compiler::CompileStats;

/// State shared by every builder and graph an engine creates.
///
/// Each builder gets a fresh serial number, which its handles carry so they
/// cannot be used with another graph.
#[derive(Debug)]
pub struct FrameGraphContext {
    next_serial: u64,
    frame_index: u64,
    compiled_graphs: u64,
    last_stats: Option<CompileStats>,
}

impl Default for FrameGraphContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameGraphContext {
    pub fn new() -> Self {
        Self {
            next_serial: 1,
            frame_index: 0,
            compiled_graphs: 0,
            last_stats: None,
        }
    }

    pub(crate) fn allocate_serial(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    /// Index of the frame currently being built
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame_index += 1;
    }

    /// Number of graphs compiled successfully
    pub fn compiled_graphs(&self) -> u64 {
        self.compiled_graphs
    }

    pub fn last_stats(&self) -> Option<&CompileStats> {
        self.last_stats.as_ref()
    }

    pub(crate) fn record_compile(&mut self, stats: CompileStats) {
        self.compiled_graphs += 1;
        self.last_stats = Some(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serials_are_unique() {
        let mut ctx = FrameGraphContext::new();
        let a = ctx.allocate_serial();
        let b = ctx.allocate_serial();
        assert_ne!(a, b);
        assert_eq!(ctx.frame_index(), 0);
        ctx.advance_frame();
        assert_eq!(ctx.frame_index(), 1);
    }
}
