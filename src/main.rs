use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier3d::prelude::*;
use liftoff::config::{load_rocket_config, RocketConfig};
use liftoff::input::RocketInputPlugin;
use liftoff::level;
use liftoff::{RocketPlugin, RocketSet};

mod scene;

/// Step Rapier by the fixed clock's delta, capped at the configured base step.
fn configure_physics_timestep(mut commands: Commands, config: Res<RocketConfig>) {
    commands.insert_resource(TimestepMode::Variable {
        max_dt: config.base_fixed_step,
        time_scale: 1.0,
        substeps: 1,
    });
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Liftoff".into(),
            resolution: WindowResolution::new(1280, 720),
            ..Default::default()
        }),
        ..Default::default()
    }))
    .insert_resource(ClearColor(Color::srgb(0.05, 0.06, 0.1)))
    // Rapier steps in the fixed schedule by whatever the fixed clock's delta
    // is, so slow motion shrinking the fixed timestep slows the simulation.
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
    .add_plugins((RocketPlugin, RocketInputPlugin))
    .add_systems(
        Startup,
        (
            configure_physics_timestep.after(load_rocket_config),
            level::spawn_demo_level.after(load_rocket_config),
            level::spawn_rocket_system.after(load_rocket_config),
            scene::setup_camera.after(load_rocket_config),
            scene::setup_hud.after(load_rocket_config),
        ),
    )
    .add_systems(
        Update,
        (
            scene::attach_level_meshes_system,
            scene::attach_rocket_mesh_system,
            scene::attach_pickup_mesh_system,
            scene::draw_trajectory_system,
            scene::camera_follow_system,
            scene::hud_update_system.after(RocketSet::Broadcast),
        ),
    );

    app.run();
}
