//! Headless demo: renders a few frames of a small scene on the dummy backend
//! and prints the compiled schedule of each.
//!
//! Run with:
//!   cargo run --bin frame_graph_demo
//!   cargo run --bin frame_graph_demo -- --frames 5 --overlay --msaa 1
//!   RUST_LOG=debug cargo run --bin frame_graph_demo

use clap::Parser;
use frame_graph_engine::{
    frame_graph::RecordedCommand,
    scene::{
        Camera, DirectionalLight, GlobalTransform, MainCamera, PointLight, SceneGraph, SceneNode,
        StaticMesh, Transform,
    },
    DummyBackend, Engine, EngineConfig, RecordingCommandList,
};
use glam::Vec3;

/// Frame graph engine demo arguments.
#[derive(Parser, Debug)]
#[command(
    name = "frame_graph_demo",
    about = "Render a small scene headlessly and print each compiled frame graph"
)]
struct DemoArgs {
    /// Number of frames to render.
    #[arg(long, default_value = "3")]
    frames: usize,

    /// Frame graphs kept in flight.
    #[arg(long, default_value = "2")]
    frames_in_flight: usize,

    /// Frame width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// MSAA sample count (1 disables the resolve pass).
    #[arg(long, default_value = "4")]
    msaa: u32,

    /// Add the debug overlay pass.
    #[arg(long)]
    overlay: bool,
}

fn spawn_scene(engine: &mut Engine<DummyBackend>) -> Result<(), Box<dyn std::error::Error>> {
    let world = engine.world_mut();

    world.spawn((
        Camera::new(Vec3::new(0.0, 5.0, 12.0), Vec3::ZERO),
        MainCamera,
    ));
    world.spawn(DirectionalLight::default());

    // A ring of cubes, each carrying a point light, under a shared pivot
    let (pivot, cubes) = {
        let mut graph = world.resource_mut::<SceneGraph>();
        let root = graph.root();
        let pivot = graph.add_node(root, Transform::IDENTITY)?;
        let mut cubes = Vec::new();
        for i in 0..6 {
            let angle = i as f32 / 6.0 * std::f32::consts::TAU;
            let position = Vec3::new(angle.cos() * 4.0, 0.0, angle.sin() * 4.0);
            let local = Transform::from_position(position);
            cubes.push((graph.add_node(pivot, local)?, local));
        }
        (pivot, cubes)
    };

    world.spawn((SceneNode(pivot), Transform::IDENTITY, GlobalTransform::IDENTITY));
    for (index, (node, local)) in cubes.into_iter().enumerate() {
        let mesh = StaticMesh::new(0, (index % 3) as u32, 36);
        let mesh = if index == 0 { mesh.without_shadows() } else { mesh };
        world.spawn((SceneNode(node), local, GlobalTransform::IDENTITY, mesh));
        world.spawn((
            SceneNode(node),
            local,
            GlobalTransform::IDENTITY,
            PointLight::default(),
        ));
    }

    // Ground plane
    world.spawn((
        StaticMesh::new(1, 3, 6).without_shadows(),
        Transform::IDENTITY.with_scale(Vec3::splat(20.0)),
    ));
    Ok(())
}

fn print_frame(frame: usize, recorder: &RecordingCommandList) {
    println!("Frame {}:", frame);
    for command in recorder.commands() {
        match command {
            RecordedCommand::BeginPass { name, pass_type } => {
                println!("  pass {} ({:?})", name, pass_type)
            }
            RecordedCommand::Barrier(barrier) => println!(
                "    barrier {}: {:?} -> {:?}",
                barrier.name, barrier.from, barrier.to
            ),
            RecordedCommand::Dispatch { x, y, z } => println!("    dispatch {}x{}x{}", x, y, z),
            _ => {}
        }
    }
    println!("  {} draws", recorder.draw_count());
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = DemoArgs::parse();
    let config = EngineConfig {
        width: args.width,
        height: args.height,
        frames_in_flight: args.frames_in_flight,
        msaa_samples: args.msaa,
        enable_debug_overlay: args.overlay,
        ..Default::default()
    };

    let mut engine = Engine::new(DummyBackend::new(), config)?;
    spawn_scene(&mut engine)?;

    let mut recorder = RecordingCommandList::new();
    for frame in 0..args.frames {
        recorder.clear();
        let stats = engine.render_frame(&mut recorder)?;
        print_frame(frame, &recorder);
        log::info!(
            "Frame {}: {} passes, {} culled, {} transient bytes ({} after aliasing)",
            frame,
            stats.scheduled_passes,
            stats.culled_passes,
            stats.transient_bytes,
            stats.aliased_bytes
        );
    }

    engine.shutdown()?;
    log::info!(
        "Created {} textures and {} buffers, {} textures still live",
        engine.backend().textures_created(),
        engine.backend().buffers_created(),
        engine.backend().live_texture_count()
    );
    Ok(())
}
