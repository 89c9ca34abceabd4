//! Scene management
//!
//! ECS components and systems that collect per-frame draw data, plus the
//! arena scene graph that owns the transform hierarchy.

mod camera;
mod components;
mod graph;
mod light;
pub mod systems;
mod transform;

pub use camera::*;
pub use components::*;
pub use graph::*;
pub use light::*;
pub use transform::*;

use bevy_ecs::prelude::*;

/// Insert the resources the scene systems expect.
pub fn init_scene_resources(world: &mut World, max_lights: usize) {
    world.insert_resource(SceneGraph::new());
    world.insert_resource(DrawList::default());
    world.insert_resource(LightList::default());
    world.insert_resource(LightLimit(max_lights));
    world.insert_resource(FrameCamera::default());
}

/// Schedule running the scene systems in dependency order.
pub fn scene_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            systems::sync_scene_graph,
            (
                systems::collect_static_meshes,
                systems::collect_lights,
                systems::update_frame_camera,
            ),
        )
            .chain(),
    );
    schedule
}
