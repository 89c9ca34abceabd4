//! Engine-level tests: ECS tick, pipeline graph and frames in flight

mod common;

use common::init_logging;
use frame_graph_engine::{
    frame_graph::{PassType, RecordedCommand},
    pipeline::{
        debug_overlay::DEBUG_OVERLAY_PASS, forward_pass::FORWARD_PASS,
        light_culling::LIGHT_CULLING_PASS, postprocess::RESOLVE_PASS, shadow_pass::SHADOW_PASS,
    },
    scene::{
        Camera, DirectionalLight, DrawList, GlobalTransform, LightList, MainCamera, PointLight,
        SceneGraph, SceneNode, StaticMesh, Transform,
    },
    DummyBackend, Engine, EngineConfig, FrameGraphError, RecordingCommandList,
};
use glam::Vec3;
use rstest::rstest;

fn small_config() -> EngineConfig {
    EngineConfig {
        width: 64,
        height: 48,
        shadow_map_size: 128,
        max_lights: 8,
        ..Default::default()
    }
}

fn populate(engine: &mut Engine<DummyBackend>) {
    let world = engine.world_mut();
    world.spawn((Camera::new(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO), MainCamera));
    world.spawn(DirectionalLight::default());
    world.spawn((StaticMesh::new(0, 0, 36), Transform::IDENTITY));
    world.spawn((
        StaticMesh::new(1, 0, 6).without_shadows(),
        Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
    ));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
fn test_frames_in_flight_do_not_leak(#[case] frames_in_flight: usize) {
    init_logging();
    let config = EngineConfig {
        frames_in_flight,
        ..small_config()
    };
    let mut engine = Engine::new(DummyBackend::new(), config).unwrap();
    populate(&mut engine);

    let mut recorder = RecordingCommandList::new();
    for frame in 0..(frames_in_flight * 2 + 1) {
        recorder.clear();
        engine.render_frame(&mut recorder).unwrap();

        // Only the swapchain images and the staging buffer outlive a frame
        assert_eq!(engine.backend().live_texture_count(), frames_in_flight);
        assert_eq!(engine.backend().live_buffer_count(), 1);
        assert_eq!(engine.ring().occupied(), (frame + 1).min(frames_in_flight));
        assert_eq!(engine.ring().current_slot(), (frame + 1) % frames_in_flight);
    }
    assert_eq!(
        engine.context().frame_index(),
        (frames_in_flight * 2 + 1) as u64
    );

    engine.shutdown().unwrap();
    assert_eq!(engine.backend().live_texture_count(), 0);
    assert_eq!(engine.backend().live_buffer_count(), 0);
}

#[test]
fn test_pipeline_schedule() {
    init_logging();
    let mut engine = Engine::new(DummyBackend::new(), small_config()).unwrap();
    populate(&mut engine);

    let mut recorder = RecordingCommandList::new();
    let stats = engine.render_frame(&mut recorder).unwrap();
    assert_eq!(
        recorder.pass_names(),
        vec![
            "light_upload",
            SHADOW_PASS,
            "depth_prepass",
            LIGHT_CULLING_PASS,
            FORWARD_PASS,
            RESOLVE_PASS,
            "tonemapping",
        ]
    );
    assert_eq!(stats.culled_passes, 0);

    // Light culling runs as compute with one group per 16x16 tile
    assert!(recorder.commands().contains(&RecordedCommand::BeginPass {
        name: LIGHT_CULLING_PASS.to_string(),
        pass_type: PassType::Compute,
    }));
    assert!(recorder
        .commands()
        .contains(&RecordedCommand::Dispatch { x: 4, y: 3, z: 1 }));

    // Shadow: 1 caster, depth prepass: 2, forward: 2, tonemap: 1 fullscreen triangle
    assert_eq!(recorder.draw_count(), 6);
    assert_eq!(engine.world().resource::<DrawList>().len(), 2);
    assert_eq!(engine.world().resource::<LightList>().lights.len(), 1);
}

#[test]
fn test_without_msaa_no_resolve_pass() {
    init_logging();
    let config = EngineConfig {
        msaa_samples: 1,
        ..small_config()
    };
    let mut engine = Engine::new(DummyBackend::new(), config).unwrap();
    let mut recorder = RecordingCommandList::new();
    engine.render_frame(&mut recorder).unwrap();
    assert!(!recorder.pass_names().contains(&RESOLVE_PASS));
}

#[rstest]
#[case::enabled(true)]
#[case::disabled(false)]
fn test_debug_overlay_toggle(#[case] enabled: bool) {
    init_logging();
    let config = EngineConfig {
        enable_debug_overlay: enabled,
        ..small_config()
    };
    let mut engine = Engine::new(DummyBackend::new(), config).unwrap();
    populate(&mut engine);

    let mut recorder = RecordingCommandList::new();
    engine.render_frame(&mut recorder).unwrap();
    let names = recorder.pass_names();
    assert_eq!(names.contains(&DEBUG_OVERLAY_PASS), enabled);
    if enabled {
        assert_eq!(names.last(), Some(&DEBUG_OVERLAY_PASS));
    }
}

#[test]
fn test_failed_frame_recovers() {
    init_logging();
    let frames_in_flight = 2;
    let mut engine = Engine::new(
        DummyBackend::new(),
        EngineConfig {
            frames_in_flight,
            ..small_config()
        },
    )
    .unwrap();
    populate(&mut engine);
    let mut recorder = RecordingCommandList::new();

    engine.backend().fail_allocations_after(2);
    let err = engine.render_frame(&mut recorder).unwrap_err();
    assert!(matches!(err, FrameGraphError::Backend(_)));
    assert_eq!(engine.context().frame_index(), 1);
    engine.backend().clear_failures();

    // Revisiting the failed slot releases what it left behind
    for _ in 0..frames_in_flight {
        recorder.clear();
        engine.render_frame(&mut recorder).unwrap();
    }
    assert_eq!(engine.backend().live_texture_count(), frames_in_flight);
    assert_eq!(engine.backend().live_buffer_count(), 1);
}

#[test]
fn test_scene_hierarchy_moves_draws() {
    init_logging();
    let mut engine = Engine::new(DummyBackend::new(), small_config()).unwrap();

    let (parent, child) = {
        let mut graph = engine.world_mut().resource_mut::<SceneGraph>();
        let root = graph.root();
        let parent = graph
            .add_node(root, Transform::from_position(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();
        let child = graph
            .add_node(parent, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();
        (parent, child)
    };
    let parent_entity = engine
        .world_mut()
        .spawn((
            SceneNode(parent),
            Transform::from_position(Vec3::new(5.0, 0.0, 0.0)),
            GlobalTransform::IDENTITY,
        ))
        .id();
    engine.world_mut().spawn((
        SceneNode(child),
        Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
        GlobalTransform::IDENTITY,
        StaticMesh::new(3, 1, 36),
        PointLight::default(),
    ));

    let mut recorder = RecordingCommandList::new();
    engine.render_frame(&mut recorder).unwrap();
    let position = engine.world().resource::<DrawList>().items[0].model.w_axis.truncate();
    assert_eq!(position, Vec3::new(5.0, 1.0, 0.0));

    engine
        .world_mut()
        .get_mut::<Transform>(parent_entity)
        .unwrap()
        .position = Vec3::new(-5.0, 0.0, 0.0);
    recorder.clear();
    engine.render_frame(&mut recorder).unwrap();
    let position = engine.world().resource::<DrawList>().items[0].model.w_axis.truncate();
    assert_eq!(position, Vec3::new(-5.0, 1.0, 0.0));
}

#[test]
fn test_resize_updates_light_culling() {
    init_logging();
    let mut engine = Engine::new(DummyBackend::new(), small_config()).unwrap();
    let mut recorder = RecordingCommandList::new();
    engine.render_frame(&mut recorder).unwrap();

    engine.resize(160, 90).unwrap();
    recorder.clear();
    engine.render_frame(&mut recorder).unwrap();
    assert!(recorder
        .commands()
        .contains(&RecordedCommand::Dispatch { x: 10, y: 6, z: 1 }));
    assert_eq!(engine.backend().live_texture_count(), 2);
}
