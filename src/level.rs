//! Level entities: the rocket, solid geometry, hazards and checkpoints.
//!
//! Everything here is physics-only.  Meshes and materials are attached by
//! the binary, so the same spawn functions run in headless tests.

use crate::config::RocketConfig;
use crate::flight::{FlightController, FlightTuning, OrientationFollow};
use crate::pickups::JuicePickup;
use crate::respawn::{CheckpointRecord, LifecycleRequest};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

// ── Markers ───────────────────────────────────────────────────────────────────

/// Marker for the player's rocket.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Rocket;

/// Solid level collider.  Copied into the shadow world for prediction.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LevelGeometry;

/// Touching this kills the rocket.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Hazard;

/// Sensor volume that records a checkpoint when the rocket enters it.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct CheckpointZone {
    /// Respawn point relative to the zone's origin.
    pub spawn_offset: Vec3,
}

impl CheckpointZone {
    pub fn record(&self, transform: &Transform) -> CheckpointRecord {
        CheckpointRecord {
            position: transform.translation + self.spawn_offset,
            rotation: Quat::IDENTITY,
        }
    }
}

// ── Rocket ────────────────────────────────────────────────────────────────────

/// Rigid-body components shared by the live rocket and the shadow rocket, so
/// both integrate identically.
///
/// Rotation is locked in Rapier ([`OrientationFollow`] owns it) and
/// translation is locked to the XY play plane.
pub fn rocket_body_bundle(config: &RocketConfig) -> impl Bundle {
    (
        RigidBody::Dynamic,
        Collider::capsule_y(
            config.rocket_collider_half_height,
            config.rocket_collider_radius,
        ),
        ColliderMassProperties::Mass(config.rocket_mass),
        Damping {
            linear_damping: config.rocket_linear_damping,
            angular_damping: 0.0,
        },
        LockedAxes::ROTATION_LOCKED | LockedAxes::TRANSLATION_LOCKED_Z,
        Velocity::zero(),
        ExternalImpulse::default(),
        ExternalForce::default(),
        OrientationFollow::new(
            config.orientation_turn_rate,
            config.orientation_min_follow_speed,
        ),
    )
}

/// Spawn the live rocket at the level start.
pub fn spawn_rocket(commands: &mut Commands, config: &RocketConfig) -> Entity {
    commands
        .spawn((
            Rocket,
            FlightController::new(FlightTuning::from_config(config)),
            rocket_body_bundle(config),
            ActiveEvents::COLLISION_EVENTS,
            Transform::from_translation(config.level_start()),
            Visibility::default(),
        ))
        .id()
}

/// Startup system: spawn the rocket and announce the end of the first spawn.
pub fn spawn_rocket_system(
    mut commands: Commands,
    config: Res<RocketConfig>,
    mut lifecycle: MessageWriter<LifecycleRequest>,
) {
    spawn_rocket(&mut commands, &config);
    lifecycle.write(LifecycleRequest::InitialSpawnEnded);
    println!("✓ Rocket spawned at {:?}", config.level_start());
}

// ── Demo level ────────────────────────────────────────────────────────────────

fn spawn_block(commands: &mut Commands, center: Vec3, half_extents: Vec3) -> Entity {
    commands
        .spawn((
            LevelGeometry,
            RigidBody::Fixed,
            Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
            Transform::from_translation(center),
        ))
        .id()
}

/// Startup system: ground, a climb of platforms, hazard strips, two
/// checkpoints and a few juice pickups.
pub fn spawn_demo_level(mut commands: Commands, config: Res<RocketConfig>) {
    // Ground
    spawn_block(&mut commands, Vec3::new(20.0, -0.5, 0.0), Vec3::new(40.0, 0.5, 2.0));

    // Platforms
    for (x, y, half_width) in [
        (6.0, 3.0, 2.0),
        (13.0, 6.0, 1.5),
        (20.0, 9.5, 2.0),
        (28.0, 7.0, 1.5),
        (35.0, 11.0, 3.0),
    ] {
        spawn_block(
            &mut commands,
            Vec3::new(x, y, 0.0),
            Vec3::new(half_width, 0.25, 2.0),
        );
    }

    // Hazards: spike strips on the ground between the platforms.
    for (x, half_width) in [(9.5, 1.5), (17.0, 2.5), (24.5, 2.0)] {
        let strip = spawn_block(
            &mut commands,
            Vec3::new(x, 0.15, 0.0),
            Vec3::new(half_width, 0.15, 2.0),
        );
        commands
            .entity(strip)
            .insert((Hazard, ActiveEvents::COLLISION_EVENTS));
    }

    // Checkpoints
    for (x, y) in [(20.0, 10.5), (35.0, 12.0)] {
        commands.spawn((
            CheckpointZone {
                spawn_offset: Vec3::new(0.0, 0.75, 0.0),
            },
            Sensor,
            Collider::cuboid(1.0, 1.0, 2.0),
            ActiveEvents::COLLISION_EVENTS,
            Transform::from_xyz(x, y, 0.0),
        ));
    }

    // Juice pickups
    for (x, y) in [(6.0, 5.0), (13.0, 8.0), (28.0, 9.0)] {
        commands.spawn((
            JuicePickup::new(config.juice_pickup_amount),
            Sensor,
            Collider::ball(0.4),
            ActiveEvents::COLLISION_EVENTS,
            Transform::from_xyz(x, y, 0.0),
            Visibility::default(),
        ));
    }

    println!("✓ Demo level spawned");
}
