//! Flight systems: the ECS glue around [`FlightController`].
//!
//! ## Pipeline
//!
//! `Update` (in [`crate::RocketSet::Flight`]):
//! 1. [`flight_command_system`]: pause / resume / launch gating.
//! 2. [`charge_input_system`]: feeds [`ChargeInput`] samples to the controller.
//! 3. [`drain_flight_events_system`]: publishes the controller outbox as
//!    [`FlightMessage`]s.
//!
//! `FixedUpdate` (before the Rapier step):
//! 1. [`burn_decay_system`]: advances the engine burn and sets `ExternalForce`.
//! 2. [`orientation_follow_system`]: turns the nose towards its target.

use super::body::{EcsRocketBody, OrientationFollow};
use super::state::{FlightController, FlightEvent};
use crate::respawn::{RespawnEvent, RespawnPhase};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

// ── Messages ──────────────────────────────────────────────────────────────────

/// One charge-input sample: `0` released, `1` fully held.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct ChargeInput {
    pub level: f32,
}

/// External control over the flight model.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum FlightCommand {
    Pause,
    Resume,
    SetCanLaunch(bool),
}

/// A [`FlightEvent`] tagged with the rocket that produced it.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct FlightMessage {
    pub rocket: Entity,
    pub event: FlightEvent,
}

/// Components the flight systems borrow from a rocket.
pub type RocketFlightQuery = (
    Entity,
    &'static mut FlightController,
    &'static Transform,
    &'static mut Velocity,
    &'static mut ExternalImpulse,
    &'static mut ExternalForce,
    &'static mut OrientationFollow,
);

// ── Variable-step systems ─────────────────────────────────────────────────────

/// Apply queued [`FlightCommand`]s to every rocket.
pub fn flight_command_system(
    mut commands: MessageReader<FlightCommand>,
    mut rockets: Query<RocketFlightQuery>,
) {
    let queued: Vec<FlightCommand> = commands.read().copied().collect();
    if queued.is_empty() {
        return;
    }
    for (_, mut flight, transform, mut velocity, mut impulse, mut force, mut follow) in
        rockets.iter_mut()
    {
        let mut body = EcsRocketBody {
            rotation: transform.rotation,
            velocity: &mut *velocity,
            impulse: &mut *impulse,
            force: &mut *force,
            orientation: &mut *follow,
        };
        for command in &queued {
            match *command {
                FlightCommand::Pause => flight.pause(),
                FlightCommand::Resume => flight.resume(&mut body),
                FlightCommand::SetCanLaunch(can_launch) => flight.set_can_launch(can_launch),
            }
        }
    }
}

/// Feed [`ChargeInput`] samples to every rocket in arrival order.
///
/// Does nothing when no rocket is spawned.
pub fn charge_input_system(
    mut inputs: MessageReader<ChargeInput>,
    mut rockets: Query<RocketFlightQuery>,
) {
    let levels: Vec<f32> = inputs.read().map(|input| input.level).collect();
    if levels.is_empty() {
        return;
    }
    for (_, mut flight, transform, mut velocity, mut impulse, mut force, mut follow) in
        rockets.iter_mut()
    {
        let mut body = EcsRocketBody {
            rotation: transform.rotation,
            velocity: &mut *velocity,
            impulse: &mut *impulse,
            force: &mut *force,
            orientation: &mut *follow,
        };
        for &level in &levels {
            flight.on_charge_input(level, &mut body);
        }
    }
}

/// Publish every rocket's queued flight events.
pub fn drain_flight_events_system(
    mut rockets: Query<(Entity, &mut FlightController)>,
    mut writer: MessageWriter<FlightMessage>,
) {
    for (rocket, mut flight) in rockets.iter_mut() {
        for event in flight.drain_events() {
            match event {
                FlightEvent::Launched {
                    charge_level,
                    impulse,
                } => info!(
                    "[flight] launch: charge={:.2} impulse={:.2}",
                    charge_level, impulse
                ),
                FlightEvent::BurnComplete => debug!("[flight] burn complete"),
                FlightEvent::ChargingStarted => debug!("[flight] charging started"),
                FlightEvent::ChargeCancelled => debug!("[flight] charge cancelled"),
            }
            writer.write(FlightMessage { rocket, event });
        }
    }
}

/// Reset flight on respawn and stop it on a fatal collision.
pub fn flight_respawn_reaction_system(
    mut events: MessageReader<RespawnEvent>,
    mut rockets: Query<RocketFlightQuery>,
) {
    let phases: Vec<RespawnPhase> = events.read().map(|e| e.phase).collect();
    if phases.is_empty() {
        return;
    }
    for (_, mut flight, transform, mut velocity, mut impulse, mut force, mut follow) in
        rockets.iter_mut()
    {
        let mut body = EcsRocketBody {
            rotation: transform.rotation,
            velocity: &mut *velocity,
            impulse: &mut *impulse,
            force: &mut *force,
            orientation: &mut *follow,
        };
        for phase in &phases {
            match phase {
                RespawnPhase::OnCollision => flight.halt(&mut body),
                RespawnPhase::BeforeRespawn => flight.reset(&mut body),
                _ => {}
            }
        }
    }
}

// ── Fixed-step systems ────────────────────────────────────────────────────────

/// Advance active burns by one fixed step.  Runs before the physics step so
/// the force is in place when Rapier integrates velocity.
pub fn burn_decay_system(time: Res<Time<Fixed>>, mut rockets: Query<RocketFlightQuery>) {
    let dt = time.delta_secs();
    for (_, mut flight, transform, mut velocity, mut impulse, mut force, mut follow) in
        rockets.iter_mut()
    {
        if flight.burn().is_none() {
            continue;
        }
        let mut body = EcsRocketBody {
            rotation: transform.rotation,
            velocity: &mut *velocity,
            impulse: &mut *impulse,
            force: &mut *force,
            orientation: &mut *follow,
        };
        flight.tick_burn(dt, &mut body);
    }
}

/// Turn each rocket towards its orientation target.
pub fn orientation_follow_system(
    time: Res<Time<Fixed>>,
    mut rockets: Query<(&OrientationFollow, &mut Transform, &Velocity)>,
) {
    let dt = time.delta_secs();
    for (follow, mut transform, velocity) in rockets.iter_mut() {
        let next = follow.step(transform.rotation, velocity.linvel, dt);
        if next != transform.rotation {
            transform.rotation = next;
        }
    }
}
