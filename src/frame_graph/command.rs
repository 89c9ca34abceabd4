//! Command recording seam.
//!
//! Execute callbacks record into a [`CommandRecorder`]. Submission and
//! fencing are left to the caller.

use std::any::Any;

use crate::backend::{BufferHandle, TextureHandle};
use crate::frame_graph::pass::PassType;
use crate::frame_graph::resource::ResourceBarrier;

/// Receives the commands recorded while a frame graph executes.
pub trait CommandRecorder {
    fn begin_pass(&mut self, name: &str, pass_type: PassType);

    fn end_pass(&mut self);

    fn barrier(&mut self, barrier: &ResourceBarrier);

    fn draw(&mut self, vertex_count: u32, instance_count: u32);

    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    fn copy_texture(&mut self, src: TextureHandle, dst: TextureHandle);

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64);

    /// Allow downcasting to a backend-specific recorder
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A command captured by [`RecordingCommandList`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginPass { name: String, pass_type: PassType },
    EndPass,
    Barrier(ResourceBarrier),
    Draw { vertex_count: u32, instance_count: u32 },
    Dispatch { x: u32, y: u32, z: u32 },
    CopyTexture { src: TextureHandle, dst: TextureHandle },
    CopyBuffer { src: BufferHandle, dst: BufferHandle, size: u64 },
}

/// Recorder that stores commands as data.
#[derive(Debug, Default)]
pub struct RecordingCommandList {
    commands: Vec<RecordedCommand>,
}

impl RecordingCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Names of the passes in the order they began.
    pub fn pass_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::BeginPass { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn barriers(&self) -> Vec<&ResourceBarrier> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::Barrier(barrier) => Some(barrier),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RecordedCommand::Draw { .. }))
            .count()
    }
}

impl CommandRecorder for RecordingCommandList {
    fn begin_pass(&mut self, name: &str, pass_type: PassType) {
        self.commands.push(RecordedCommand::BeginPass {
            name: name.to_string(),
            pass_type,
        });
    }

    fn end_pass(&mut self) {
        self.commands.push(RecordedCommand::EndPass);
    }

    fn barrier(&mut self, barrier: &ResourceBarrier) {
        self.commands.push(RecordedCommand::Barrier(barrier.clone()));
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.commands.push(RecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch { x, y, z });
    }

    fn copy_texture(&mut self, src: TextureHandle, dst: TextureHandle) {
        self.commands.push(RecordedCommand::CopyTexture { src, dst });
    }

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64) {
        self.commands
            .push(RecordedCommand::CopyBuffer { src, dst, size });
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
