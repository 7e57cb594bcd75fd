//! Lifecycle systems: contact routing, the coordinator tick, and applying
//! respawn side effects to the rocket entity.

use super::coordinator::{
    CheckpointRecord, RespawnCoordinator, RespawnEvent, RespawnHost, RespawnListeners,
    RespawnSignals,
};
use crate::config::RocketConfig;
use crate::ledger::{publish_changes, LedgerChanged};
use crate::level::{CheckpointZone, Hazard, Rocket};
use crate::pickups::{JuicePickup, PickupTouched};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

/// Input queue of the respawn coordinator.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum LifecycleRequest {
    Respawn,
    FatalCollision,
    Checkpoint(CheckpointRecord),
    /// Reset juice, pickups and checkpoint to the level start, then respawn.
    RestartLevel,
    InitialSpawnEnded,
}

// ── Buffered host ─────────────────────────────────────────────────────────────

/// [`RespawnHost`] that notifies registered listeners immediately and buffers
/// everything else until the coordinator call returns.
pub struct BufferedRespawnHost<'a> {
    listeners: &'a mut RespawnListeners,
    effects: RespawnEffects,
}

/// Effects collected by [`BufferedRespawnHost`].  Later writes win.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RespawnEffects {
    pub events: Vec<RespawnEvent>,
    pub teleport: Option<CheckpointRecord>,
    pub collision_enabled: Option<bool>,
    pub visible: Option<bool>,
}

impl<'a> BufferedRespawnHost<'a> {
    pub fn new(listeners: &'a mut RespawnListeners) -> Self {
        Self {
            listeners,
            effects: RespawnEffects::default(),
        }
    }

    pub fn finish(self) -> RespawnEffects {
        self.effects
    }
}

impl RespawnHost for BufferedRespawnHost<'_> {
    fn broadcast(&mut self, event: RespawnEvent, signals: &mut RespawnSignals) {
        self.listeners.broadcast(&event, signals);
        self.effects.events.push(event);
    }

    fn move_to_checkpoint(&mut self, checkpoint: &CheckpointRecord) {
        self.effects.teleport = Some(*checkpoint);
    }

    fn set_collision_enabled(&mut self, enabled: bool) {
        self.effects.collision_enabled = Some(enabled);
    }

    fn set_body_visible(&mut self, visible: bool) {
        self.effects.visible = Some(visible);
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Startup system: rebuild the coordinator from the loaded config.
pub fn init_respawn_from_config(mut commands: Commands, config: Res<RocketConfig>) {
    commands.insert_resource(RespawnCoordinator::new(
        CheckpointRecord::at(config.level_start()),
        config.explosion_delay_secs,
    ));
}

/// Turn Rapier contact starts involving the rocket into lifecycle requests
/// and pickup touches.
pub fn contact_routing_system(
    mut collisions: MessageReader<CollisionEvent>,
    rockets: Query<(), With<Rocket>>,
    hazards: Query<(), With<Hazard>>,
    checkpoints: Query<(&CheckpointZone, &Transform)>,
    pickups: Query<(), With<JuicePickup>>,
    mut lifecycle: MessageWriter<LifecycleRequest>,
    mut touched: MessageWriter<PickupTouched>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(a, b, _) = *event else {
            continue;
        };
        let other = if rockets.contains(a) {
            b
        } else if rockets.contains(b) {
            a
        } else {
            continue;
        };

        if hazards.contains(other) {
            lifecycle.write(LifecycleRequest::FatalCollision);
        } else if let Ok((zone, transform)) = checkpoints.get(other) {
            lifecycle.write(LifecycleRequest::Checkpoint(zone.record(transform)));
        } else if pickups.contains(other) {
            touched.write(PickupTouched { pickup: other });
        }
    }
}

/// Feed lifecycle requests to the coordinator, advance the explosion delay on
/// real time, then publish the resulting events and apply the side effects to
/// the rocket.
pub fn respawn_coordinator_system(
    real_time: Res<Time<Real>>,
    mut requests: MessageReader<LifecycleRequest>,
    mut coordinator: ResMut<RespawnCoordinator>,
    mut listeners: ResMut<RespawnListeners>,
    mut writer: MessageWriter<RespawnEvent>,
    mut commands: Commands,
    mut rockets: Query<(Entity, &mut Transform, &mut Velocity, &mut Visibility), With<Rocket>>,
) {
    let mut host = BufferedRespawnHost::new(&mut *listeners);
    // Advance an explosion started on an earlier frame before taking new
    // requests, so a death always spans at least one frame.
    if coordinator.is_exploding() {
        coordinator.tick(real_time.delta_secs(), &mut host);
    }
    for request in requests.read() {
        match *request {
            LifecycleRequest::Respawn => {
                coordinator.respawn(&mut host);
            }
            LifecycleRequest::FatalCollision => {
                coordinator.on_fatal_collision(&mut host);
            }
            LifecycleRequest::Checkpoint(record) => {
                coordinator.on_checkpoint(record, &mut host);
            }
            LifecycleRequest::RestartLevel => {
                info!("[respawn] restarting level");
                coordinator.restart_level(&mut host);
            }
            LifecycleRequest::InitialSpawnEnded => {
                coordinator.finish_initial_spawn(&mut host);
            }
        }
    }
    let effects = host.finish();

    for event in &effects.events {
        writer.write(*event);
    }
    for (entity, mut transform, mut velocity, mut visibility) in rockets.iter_mut() {
        if let Some(record) = effects.teleport {
            transform.translation = record.position;
            transform.rotation = record.rotation;
            *velocity = Velocity::zero();
        }
        match effects.collision_enabled {
            Some(true) => {
                commands.entity(entity).remove::<ColliderDisabled>();
            }
            Some(false) => {
                commands.entity(entity).insert(ColliderDisabled);
            }
            None => {}
        }
        if let Some(visible) = effects.visible {
            *visibility = if visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }
    }
}

/// Publish respawn-counter changes.
pub fn broadcast_respawn_count_system(
    mut coordinator: ResMut<RespawnCoordinator>,
    mut writer: MessageWriter<LedgerChanged>,
) {
    if !coordinator.respawn_counter_mut().has_pending_changes() {
        return;
    }
    publish_changes(coordinator.respawn_counter_mut(), &mut writer);
}
