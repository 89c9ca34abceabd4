//! ECS systems feeding the frame graph

use bevy_ecs::prelude::*;

use crate::scene::camera::Camera;
use crate::scene::components::{
    DrawItem, DrawList, FrameCamera, LightLimit, LightList, MainCamera, SceneNode, StaticMesh,
};
use crate::scene::graph::SceneGraph;
use crate::scene::light::{DirectionalLight, PointLight};
use crate::scene::transform::{GlobalTransform, Transform};

/// Push changed local transforms into the scene graph, update it, and copy
/// world matrices back to `GlobalTransform`.
pub fn sync_scene_graph(
    mut graph: ResMut<SceneGraph>,
    changed: Query<(&SceneNode, &Transform), Changed<Transform>>,
    mut globals: Query<(&SceneNode, &mut GlobalTransform)>,
) {
    for (node, transform) in &changed {
        if let Err(err) = graph.set_local_transform(node.0, *transform) {
            log::warn!("Skipping transform sync: {}", err);
        }
    }

    let events = graph.update();
    if events.is_empty() {
        return;
    }
    log::trace!("Scene graph processed {} events", events.len());

    for (node, mut global) in &mut globals {
        if let Some(world) = graph.world_matrix(node.0) {
            if global.0 != world {
                global.0 = world;
            }
        }
    }
}

/// Static-mesh render system: walk mesh entities and rebuild the draw list.
pub fn collect_static_meshes(
    mut draw_list: ResMut<DrawList>,
    meshes: Query<(Entity, &StaticMesh, Option<&GlobalTransform>, Option<&Transform>)>,
) {
    draw_list.items.clear();
    for (entity, mesh, global, local) in &meshes {
        let model = match (global, local) {
            (Some(global), _) => global.0,
            (None, Some(local)) => local.matrix(),
            (None, None) => glam::Mat4::IDENTITY,
        };
        draw_list.items.push(DrawItem {
            entity,
            mesh_id: mesh.mesh_id,
            material_id: mesh.material_id,
            vertex_count: mesh.vertex_count,
            casts_shadows: mesh.casts_shadows,
            model,
        });
    }
    draw_list
        .items
        .sort_by_key(|item| (item.material_id, item.mesh_id, item.entity));
}

/// Gather lights up to the configured limit.
pub fn collect_lights(
    limit: Res<LightLimit>,
    mut light_list: ResMut<LightList>,
    directional: Query<&DirectionalLight>,
    points: Query<(Entity, &PointLight, &GlobalTransform)>,
) {
    light_list.lights.clear();
    light_list.overflow = 0;

    let mut sorted_points: Vec<_> = points.iter().collect();
    sorted_points.sort_by_key(|(entity, _, _)| *entity);

    let all = directional
        .iter()
        .map(DirectionalLight::gpu_data)
        .chain(
            sorted_points
                .into_iter()
                .map(|(_, light, global)| light.gpu_data(global.translation())),
        );
    for light in all {
        if light_list.lights.len() < limit.0 {
            light_list.lights.push(light);
        } else {
            light_list.overflow += 1;
        }
    }
    if light_list.overflow > 0 {
        log::warn!(
            "{} lights exceed the limit of {} and were dropped",
            light_list.overflow,
            limit.0
        );
    }
}

/// Copy the main camera into [`FrameCamera`].
pub fn update_frame_camera(
    mut frame_camera: ResMut<FrameCamera>,
    cameras: Query<&Camera, With<MainCamera>>,
) {
    if let Some(camera) = cameras.iter().next() {
        frame_camera.0 = camera.uniform_data();
    }
}
