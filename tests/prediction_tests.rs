//! Shadow-world prediction tests.
//!
//! The shadow world runs its own Rapier pipeline, so these tests exercise real
//! physics.  The only geometry is a floor far below the launch point, so
//! nothing is hit within the prediction horizon.
//!
//! Covered scenarios:
//! 1. A prediction has exactly `prediction_steps` points.
//! 2. Identical inputs give identical predictions.
//! 3. An upward launch climbs and stays in the play plane.
//! 4. The live prediction system fills the preview while charging and
//!    clears it after launch, without moving the live rocket.

use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use liftoff::config::RocketConfig;
use liftoff::flight::ChargeInput;
use liftoff::level::{self, Rocket};
use liftoff::prediction::{trajectory_prediction_system, ShadowWorld, TrajectoryPreview};
use liftoff::RocketPlugin;

const STEP: f32 = 1.0 / 60.0;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn shadow_with_floor(config: &RocketConfig) -> ShadowWorld {
    let mut shadow = ShadowWorld::new(config);
    shadow
        .rebuild_geometry([(
            Collider::cuboid(100.0, 0.5, 5.0),
            Transform::from_xyz(0.0, -1000.0, 0.0),
        )])
        .expect("floor copied into the shadow world");
    shadow
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn prediction_has_one_point_per_step() {
    let config = RocketConfig::default();
    let mut shadow = shadow_with_floor(&config);
    let points = shadow
        .predict(&Transform::from_xyz(0.0, 2.0, 0.0), 0.5, STEP)
        .unwrap();
    assert_eq!(points.len(), config.prediction_steps);
}

#[test]
fn identical_inputs_give_identical_predictions() {
    let config = RocketConfig::default();
    let mut shadow = shadow_with_floor(&config);
    let start = Transform::from_xyz(1.0, 2.0, 0.0);

    let first = shadow.predict(&start, 0.75, STEP).unwrap();
    let _other = shadow
        .predict(&Transform::from_xyz(-3.0, 5.0, 0.0), 0.2, STEP)
        .unwrap();
    let again = shadow.predict(&start, 0.75, STEP).unwrap();
    assert_eq!(first, again);
}

#[test]
fn upward_launch_climbs() {
    let config = RocketConfig::default();
    let mut shadow = shadow_with_floor(&config);
    let points = shadow
        .predict(&Transform::from_xyz(0.0, 0.0, 0.0), 1.0, STEP)
        .unwrap();

    assert!(points[5].y > 0.0, "rocket rises after launch: {:?}", points[5]);
    let apex = points
        .iter()
        .map(|p| p.y)
        .fold(f32::NEG_INFINITY, f32::max);
    assert!(apex > points[5].y);
    assert!(
        points.iter().all(|p| p.z.abs() < 1e-4),
        "motion stays in the play plane"
    );
}

#[test]
fn live_preview_follows_charging() {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, RocketPlugin));
    app.add_systems(
        Startup,
        (level::spawn_demo_level, level::spawn_rocket_system),
    );
    app.update();
    // A second frame so the geometry sync has seen the level.
    app.update();

    let steps = app.world().resource::<RocketConfig>().prediction_steps;
    let world = app.world_mut();
    let rocket = world
        .query_filtered::<Entity, With<Rocket>>()
        .single(world)
        .expect("one rocket");
    let start = world.get::<Transform>(rocket).unwrap().translation;

    world.write_message(ChargeInput { level: 0.6 });
    app.update();
    app.world_mut()
        .run_system_once(trajectory_prediction_system)
        .expect("prediction system runs");
    assert_eq!(app.world().resource::<TrajectoryPreview>().points.len(), steps);
    assert_eq!(
        app.world().get::<Transform>(rocket).unwrap().translation,
        start,
        "prediction never moves the live rocket"
    );

    app.world_mut().write_message(ChargeInput { level: 0.0 });
    app.update();
    app.world_mut()
        .run_system_once(trajectory_prediction_system)
        .expect("prediction system runs");
    assert!(app.world().resource::<TrajectoryPreview>().is_empty());
}
