//! Frame Graph Engine - a frame-graph rendering core with Forward+ lighting
//!
//! Each frame, passes declare the transient and imported resources they
//! create, read and write. The graph orders the passes, culls the ones that
//! do not contribute to the backbuffer, and realizes every transient just in
//! time for its first use and releases it right after its last.
//!
//! # Features
//! - Frame graph with typed, versioned resource handles
//! - Dependency ordering, culling, barrier planning and an aliasing plan
//! - Frames-in-flight ring that retires old graphs
//! - Forward+ pipeline (shadow, depth prepass, light culling, MSAA, tonemapping)
//! - Entity Component System (ECS) based scene management using Bevy ECS
//! - Headless [`DummyBackend`] for tests and tooling

pub mod backend;
pub mod engine;
pub mod frame_graph;
pub mod pipeline;
pub mod scene;

// Re-export Bevy ECS prelude for users
pub use bevy_ecs::prelude::*;

pub use backend::{DummyBackend, GraphicsBackend};
pub use engine::Engine;
pub use frame_graph::{
    FrameGraph, FrameGraphBuilder, FrameGraphContext, FrameGraphError, FrameGraphResult,
    FrameGraphRing, RecordingCommandList,
};

/// Configuration for initializing the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Backbuffer width
    pub width: u32,
    /// Backbuffer height
    pub height: u32,
    /// Number of frame graphs kept alive while the GPU may still use them
    pub frames_in_flight: usize,
    /// Resource name that roots culling
    pub backbuffer_name: String,
    /// Sample count of the forward pass targets (1 disables MSAA)
    pub msaa_samples: u32,
    /// Edge of the square shadow map
    pub shadow_map_size: u32,
    /// Draw the debug overlay after tonemapping
    pub enable_debug_overlay: bool,
    /// Maximum number of lights uploaded per frame
    pub max_lights: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frames_in_flight: 2,
            backbuffer_name: "backbuffer".to_string(),
            msaa_samples: 4,
            shadow_map_size: 2048,
            enable_debug_overlay: false,
            max_lights: 256,
        }
    }
}

impl EngineConfig {
    /// Clamp counts and sizes to at least 1.
    pub fn normalized(mut self) -> Self {
        self.width = self.width.max(1);
        self.height = self.height.max(1);
        self.frames_in_flight = self.frames_in_flight.max(1);
        self.msaa_samples = self.msaa_samples.max(1);
        self.shadow_map_size = self.shadow_map_size.max(1);
        self.max_lights = self.max_lights.max(1);
        self
    }
}
