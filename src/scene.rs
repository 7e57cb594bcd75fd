//! Presentation for the binary: camera, meshes, trajectory gizmo and HUD.
//!
//! The library spawns physics-only entities; everything visible is attached
//! here when those entities first appear.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use liftoff::config::RocketConfig;
use liftoff::ledger::{LedgerChanged, JUICE_KEY, RESPAWN_COUNT_KEY};
use liftoff::level::{CheckpointZone, Hazard, LevelGeometry, Rocket};
use liftoff::pickups::JuicePickup;
use liftoff::prediction::TrajectoryPreview;

const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 3.0, 28.0);
const CAMERA_FOLLOW_RATE: f32 = 4.0;

#[derive(Component)]
pub struct HudText;

/// Last broadcast values shown on the HUD.
#[derive(Resource, Debug, Default)]
pub struct HudState {
    juice: f32,
    respawns: i32,
}

// ── Startup ───────────────────────────────────────────────────────────────────

pub fn setup_camera(mut commands: Commands, config: Res<RocketConfig>) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(config.level_start() + CAMERA_OFFSET)
            .looking_at(config.level_start(), Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(10.0, 30.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    eprintln!("[SETUP] Camera spawned");
}

pub fn setup_hud(mut commands: Commands, config: Res<RocketConfig>) {
    commands.insert_resource(HudState {
        juice: config.juice_initial,
        respawns: 0,
    });
    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            top: Val::Px(10.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                HudText,
                Text::new(hud_line(config.juice_initial, 0)),
                TextFont {
                    font_size: 20.0,
                    ..default()
                },
                TextColor(Color::srgb(0.95, 0.88, 0.45)),
            ));
        });
}

fn hud_line(juice: f32, respawns: i32) -> String {
    format!("Juice: {juice:.0}  |  Respawns: {respawns}")
}

// ── Meshes ────────────────────────────────────────────────────────────────────

fn cuboid_mesh(collider: &Collider) -> Option<Cuboid> {
    collider
        .as_cuboid()
        .map(|cuboid| Cuboid::from_size(cuboid.half_extents() * 2.0))
}

/// Give newly spawned level blocks and checkpoints a mesh.
pub fn attach_level_meshes_system(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    blocks: Query<(Entity, &Collider, Has<Hazard>), Added<LevelGeometry>>,
    checkpoints: Query<(Entity, &Collider), Added<CheckpointZone>>,
) {
    for (entity, collider, hazard) in blocks.iter() {
        let Some(shape) = cuboid_mesh(collider) else {
            continue;
        };
        let color = if hazard {
            Color::srgb(0.85, 0.2, 0.15)
        } else {
            Color::srgb(0.45, 0.47, 0.52)
        };
        commands.entity(entity).insert((
            Mesh3d(meshes.add(shape)),
            MeshMaterial3d(materials.add(color)),
        ));
    }
    for (entity, collider) in checkpoints.iter() {
        let Some(shape) = cuboid_mesh(collider) else {
            continue;
        };
        commands.entity(entity).insert((
            Mesh3d(meshes.add(shape)),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgba(0.2, 0.85, 0.35, 0.25),
                alpha_mode: AlphaMode::Blend,
                ..default()
            })),
        ));
    }
}

pub fn attach_rocket_mesh_system(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<RocketConfig>,
    rockets: Query<Entity, Added<Rocket>>,
) {
    for entity in rockets.iter() {
        commands.entity(entity).insert((
            Mesh3d(meshes.add(Capsule3d::new(
                config.rocket_collider_radius,
                config.rocket_collider_half_height * 2.0,
            ))),
            MeshMaterial3d(materials.add(Color::srgb(0.9, 0.9, 0.95))),
        ));
    }
}

pub fn attach_pickup_mesh_system(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    pickups: Query<Entity, Added<JuicePickup>>,
) {
    for entity in pickups.iter() {
        commands.entity(entity).insert((
            Mesh3d(meshes.add(Sphere::new(0.4))),
            MeshMaterial3d(materials.add(Color::srgb(0.3, 0.6, 1.0))),
        ));
    }
}

// ── Per-frame ─────────────────────────────────────────────────────────────────

pub fn draw_trajectory_system(preview: Res<TrajectoryPreview>, mut gizmos: Gizmos) {
    if preview.is_empty() {
        return;
    }
    gizmos.linestrip(preview.points.iter().copied(), Color::srgb(1.0, 0.8, 0.2));
}

pub fn camera_follow_system(
    time: Res<Time<Real>>,
    rockets: Query<&Transform, With<Rocket>>,
    mut cameras: Query<&mut Transform, (With<Camera3d>, Without<Rocket>)>,
) {
    let Ok(rocket) = rockets.single() else {
        return;
    };
    let t = (CAMERA_FOLLOW_RATE * time.delta_secs()).min(1.0);
    for mut camera in cameras.iter_mut() {
        let target = rocket.translation + CAMERA_OFFSET;
        camera.translation = camera.translation.lerp(target, t);
    }
}

pub fn hud_update_system(
    mut changes: MessageReader<LedgerChanged>,
    mut state: ResMut<HudState>,
    mut text: Query<&mut Text, With<HudText>>,
) {
    let mut dirty = false;
    for change in changes.read() {
        match change.key {
            JUICE_KEY => state.juice = change.value,
            RESPAWN_COUNT_KEY => state.respawns = change.value as i32,
            _ => continue,
        }
        dirty = true;
    }
    if !dirty {
        return;
    }
    for mut line in text.iter_mut() {
        line.0 = hud_line(state.juice, state.respawns);
    }
}
