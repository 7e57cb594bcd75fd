//! Rocket flight core: charge-to-launch flight, time dilation, juice economy,
//! checkpoint respawn and trajectory prediction, on Bevy + Rapier.
//!
//! ## Module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`config`] | [`config::RocketConfig`] resource and TOML loading |
//! | [`constants`] | Compile-time defaults |
//! | [`error`] | [`error::RocketError`] and validation helpers |
//! | [`ledger`] | Bounded numeric ledgers (juice, respawn count) |
//! | [`flight`] | Charge → launch → burn state machine |
//! | [`dilation`] | Slow motion driven by juice |
//! | [`respawn`] | Death, checkpoint and respawn sequencing |
//! | [`pickups`] | One-shot juice pickups, level restart |
//! | [`prediction`] | Shadow physics world and trajectory preview |
//! | [`level`] | Rocket and level entity spawning |
//! | [`input`] | Keyboard / gamepad glue (binary only) |
//!
//! [`RocketPlugin`] wires everything except input, rendering and the Rapier
//! plugin itself, so integration tests can run it under `MinimalPlugins`.

pub mod config;
pub mod constants;
pub mod dilation;
pub mod error;
pub mod flight;
pub mod input;
pub mod ledger;
pub mod level;
pub mod pickups;
pub mod prediction;
pub mod respawn;

use bevy::prelude::*;
use bevy_rapier3d::prelude::CollisionEvent;

use config::RocketConfig;
use dilation::{DilationRequest, TimeDilation};
use flight::{ChargeInput, FlightCommand, FlightMessage};
use ledger::{JuiceLedger, LedgerChanged};
use pickups::PickupTouched;
use prediction::TrajectoryPreview;
use respawn::{
    CheckpointRecord, LifecycleRequest, RespawnCoordinator, RespawnEvent, RespawnListeners,
    RespawnLogListener,
};

/// Ordering of the variable-step frame.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RocketSet {
    /// Device input → core messages.
    Input,
    /// Flight commands and charge samples.
    Flight,
    /// Slow-motion requests and clock update.
    Dilation,
    /// Contacts, respawn sequencing and the reactions to it.
    Lifecycle,
    /// Ledger change broadcasts.
    Broadcast,
}

/// Core gameplay plugin.  Expects `RapierPhysicsPlugin` to be added by the
/// caller.
pub struct RocketPlugin;

impl Plugin for RocketPlugin {
    fn build(&self, app: &mut App) {
        let defaults = RocketConfig::default();
        let mut listeners = RespawnListeners::default();
        listeners.register(Box::new(RespawnLogListener));

        app.add_message::<ChargeInput>()
            .add_message::<FlightCommand>()
            .add_message::<FlightMessage>()
            .add_message::<DilationRequest>()
            .add_message::<LifecycleRequest>()
            .add_message::<RespawnEvent>()
            .add_message::<PickupTouched>()
            .add_message::<LedgerChanged>()
            // Registered by Rapier too; listed so the plugin runs without it.
            .add_message::<CollisionEvent>()
            // Defaults until the Startup chain rebuilds them from the loaded config.
            .insert_resource(defaults.clone())
            .insert_resource(JuiceLedger::from_config(&defaults))
            .insert_resource(TimeDilation::default())
            .insert_resource(RespawnCoordinator::new(
                CheckpointRecord::at(defaults.level_start()),
                defaults.explosion_delay_secs,
            ))
            .insert_resource(listeners)
            .init_resource::<TrajectoryPreview>()
            .configure_sets(
                Update,
                (
                    RocketSet::Input,
                    RocketSet::Flight,
                    RocketSet::Dilation,
                    RocketSet::Lifecycle,
                    RocketSet::Broadcast,
                )
                    .chain(),
            )
            .add_systems(
                Startup,
                (
                    // Config first so every init sees the final values.
                    config::load_rocket_config,
                    ledger::init_juice_from_config,
                    dilation::init_dilation_from_config,
                    respawn::init_respawn_from_config,
                    prediction::init_shadow_world,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    flight::flight_command_system,
                    flight::charge_input_system,
                    flight::drain_flight_events_system,
                )
                    .chain()
                    .in_set(RocketSet::Flight),
            )
            .add_systems(
                Update,
                (dilation::dilation_request_system, dilation::dilation_tick_system)
                    .chain()
                    .in_set(RocketSet::Dilation),
            )
            .add_systems(
                Update,
                (
                    respawn::contact_routing_system,
                    pickups::level_restart_system,
                    respawn::respawn_coordinator_system,
                    (
                        flight::flight_respawn_reaction_system,
                        dilation::dilation_respawn_reaction_system,
                        ledger::juice_respawn_reaction_system,
                        pickups::pickup_respawn_reaction_system,
                    )
                        .chain(),
                    pickups::pickup_touch_system,
                    pickups::pickup_visibility_system,
                    prediction::shadow_geometry_sync_system,
                )
                    .chain()
                    .in_set(RocketSet::Lifecycle),
            )
            .add_systems(
                Update,
                (
                    ledger::broadcast_juice_changes_system,
                    respawn::broadcast_respawn_count_system,
                )
                    .chain()
                    .in_set(RocketSet::Broadcast),
            )
            .add_systems(
                FixedUpdate,
                (
                    flight::burn_decay_system,
                    flight::orientation_follow_system,
                    prediction::trajectory_prediction_system,
                )
                    .chain(),
            );
    }
}
