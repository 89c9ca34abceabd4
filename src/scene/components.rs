//! Renderable components and per-frame ECS resources

use bevy_ecs::prelude::*;
use glam::Mat4;

use crate::scene::camera::CameraUniformData;
use crate::scene::graph::NodeId;
use crate::scene::light::GpuLightData;

/// Mesh drawn by the shadow and forward passes
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticMesh {
    pub mesh_id: u32,
    pub material_id: u32,
    pub vertex_count: u32,
    pub casts_shadows: bool,
}

impl StaticMesh {
    pub fn new(mesh_id: u32, material_id: u32, vertex_count: u32) -> Self {
        Self {
            mesh_id,
            material_id,
            vertex_count,
            casts_shadows: true,
        }
    }

    pub fn without_shadows(mut self) -> Self {
        self.casts_shadows = false;
        self
    }
}

/// Links an entity to its node in the [`SceneGraph`](super::SceneGraph)
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneNode(pub NodeId);

/// Marks the camera the frame is rendered from
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MainCamera;

/// One mesh to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub entity: Entity,
    pub mesh_id: u32,
    pub material_id: u32,
    pub vertex_count: u32,
    pub casts_shadows: bool,
    pub model: Mat4,
}

/// Meshes collected for the current frame, sorted by material then mesh
#[derive(Resource, Debug, Clone, Default)]
pub struct DrawList {
    pub items: Vec<DrawItem>,
}

impl DrawList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn shadow_casters(&self) -> impl Iterator<Item = &DrawItem> {
        self.items.iter().filter(|item| item.casts_shadows)
    }
}

/// Lights collected for the current frame
#[derive(Resource, Debug, Clone, Default)]
pub struct LightList {
    pub lights: Vec<GpuLightData>,
    /// Lights dropped because the list was full
    pub overflow: usize,
}

/// Camera the frame is rendered from
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameCamera(pub CameraUniformData);

/// Capacity of [`LightList`]
#[derive(Resource, Debug, Clone, Copy)]
pub struct LightLimit(pub usize);
