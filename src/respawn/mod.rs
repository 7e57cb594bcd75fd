//! Respawn module: lifecycle coordination for the rocket.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`coordinator`] | [`RespawnCoordinator`] phase sequencing, checkpoint record, listener registry |
//! | [`systems`] | Contact routing, the coordinator system, respawn side effects on the rocket |

pub mod coordinator;
pub mod systems;

pub use coordinator::{
    CheckpointRecord, ListenerId, RespawnCoordinator, RespawnEvent, RespawnHost, RespawnListener,
    RespawnListeners, RespawnLogListener, RespawnPhase, RespawnSignals,
};
pub use systems::{
    broadcast_respawn_count_system, contact_routing_system, init_respawn_from_config,
    respawn_coordinator_system, BufferedRespawnHost, LifecycleRequest, RespawnEffects,
};
