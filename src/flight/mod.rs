//! Flight module: charge → launch → engine-burn state machine and its systems.
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`state`] | [`FlightController`] state machine, burn curve, [`FlightEvent`] |
//! | [`body`] | [`RocketBody`] rigid-body handle, ECS adapter, [`OrientationFollow`] |
//! | [`control`] | Bevy systems and messages wrapping the controller |

pub mod body;
pub mod control;
pub mod state;

pub use body::{EcsRocketBody, OrientationFollow, OrientationMode, RocketBody};
pub use control::{
    burn_decay_system, charge_input_system, drain_flight_events_system, flight_command_system,
    flight_respawn_reaction_system, orientation_follow_system, ChargeInput, FlightCommand,
    FlightMessage, RocketFlightQuery,
};
pub use state::{burn_force_at, BurnState, FlightController, FlightEvent, FlightMode, FlightTuning};
