//! Respawn coordinator: ordered lifecycle broadcasts and checkpoint tracking.
//!
//! Every death walks listeners through the same sequence:
//!
//! ```text
//! OnCollision ─(explosion delay, real time)─▶ BeforeRespawn ─▶ OnRespawnStart ─▶ OnRespawnEnd
//!                                                  │
//!                                   reposition to checkpoint, re-enable collision
//! ```
//!
//! The coordinator owns no ECS state.  Side effects go through a
//! [`RespawnHost`], which the ECS system implements by buffering them and
//! the unit tests implement with a recorder.

use crate::ledger::ResourceLedger;
use crate::ledger::RESPAWN_COUNT_KEY;
use bevy::prelude::*;

// ── Phases and events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespawnPhase {
    BeforeRespawn,
    OnRespawnStart,
    OnRespawnEnd,
    /// Fatal collision; always precedes the respawn triple for that death.
    OnCollision,
    /// A checkpoint was reached; subsystems bank their state.
    OnCheckpoint,
    OnInitialSpawnEnded,
}

/// One lifecycle broadcast.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct RespawnEvent {
    pub phase: RespawnPhase,
    /// Respawn counter at the time of the broadcast.
    pub respawn_count: i32,
}

/// Transform the rocket returns to on respawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointRecord {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CheckpointRecord {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

// ── Listeners ─────────────────────────────────────────────────────────────────

/// Requests a listener can make while handling a broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RespawnSignals {
    respawn_requested: bool,
}

impl RespawnSignals {
    /// Ask for a respawn.  Ignored while a respawn sequence is running.
    pub fn request_respawn(&mut self) {
        self.respawn_requested = true;
    }

    #[inline]
    pub fn respawn_requested(&self) -> bool {
        self.respawn_requested
    }
}

/// Capability interface for anything that reacts to lifecycle phases.
pub trait RespawnListener: Send + Sync {
    fn on_respawn_event(&mut self, event: &RespawnEvent, signals: &mut RespawnSignals);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Registered listeners, notified in registration order.
#[derive(Resource, Default)]
pub struct RespawnListeners {
    next_id: u32,
    entries: Vec<(ListenerId, Box<dyn RespawnListener>)>,
}

impl RespawnListeners {
    pub fn register(&mut self, listener: Box<dyn RespawnListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Returns whether `id` was registered.
    pub fn deregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn broadcast(&mut self, event: &RespawnEvent, signals: &mut RespawnSignals) {
        for (_, listener) in self.entries.iter_mut() {
            listener.on_respawn_event(event, signals);
        }
    }
}

/// Logs every phase.  Registered by the plugin.
pub struct RespawnLogListener;

impl RespawnListener for RespawnLogListener {
    fn on_respawn_event(&mut self, event: &RespawnEvent, _signals: &mut RespawnSignals) {
        match event.phase {
            RespawnPhase::OnCollision => info!("[respawn] fatal collision"),
            RespawnPhase::OnRespawnEnd => {
                info!("[respawn] respawn #{} complete", event.respawn_count)
            }
            RespawnPhase::OnCheckpoint => info!("[respawn] checkpoint reached"),
            phase => debug!("[respawn] {:?}", phase),
        }
    }
}

// ── Host ──────────────────────────────────────────────────────────────────────

/// Side effects the coordinator needs from the world it runs in.
pub trait RespawnHost {
    /// Deliver `event` to every listener, in order.
    fn broadcast(&mut self, event: RespawnEvent, signals: &mut RespawnSignals);
    fn move_to_checkpoint(&mut self, checkpoint: &CheckpointRecord);
    fn set_collision_enabled(&mut self, enabled: bool);
    fn set_body_visible(&mut self, visible: bool);
}

// ── Coordinator ───────────────────────────────────────────────────────────────

/// Lifecycle state machine for the rocket.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct RespawnCoordinator {
    level_start: CheckpointRecord,
    checkpoint: CheckpointRecord,
    respawn_count: ResourceLedger<i32>,
    explosion_delay: f32,
    /// Real seconds left before the pending respawn.
    explosion: Option<f32>,
    is_respawning: bool,
    body_hidden: bool,
    initial_spawn_ended: bool,
}

impl RespawnCoordinator {
    pub fn new(level_start: CheckpointRecord, explosion_delay: f32) -> Self {
        Self {
            level_start,
            checkpoint: level_start,
            respawn_count: ResourceLedger::new(RESPAWN_COUNT_KEY, 0).with_min(0),
            explosion_delay,
            explosion: None,
            is_respawning: false,
            body_hidden: false,
            initial_spawn_ended: false,
        }
    }

    #[inline]
    pub fn checkpoint(&self) -> &CheckpointRecord {
        &self.checkpoint
    }

    #[inline]
    pub fn respawn_count(&self) -> i32 {
        self.respawn_count.current()
    }

    /// Counter ledger, drained by the broadcast system.
    pub fn respawn_counter_mut(&mut self) -> &mut ResourceLedger<i32> {
        &mut self.respawn_count
    }

    #[inline]
    pub fn is_respawning(&self) -> bool {
        self.is_respawning
    }

    #[inline]
    pub fn is_exploding(&self) -> bool {
        self.explosion.is_some()
    }

    #[inline]
    pub fn initial_spawn_ended(&self) -> bool {
        self.initial_spawn_ended
    }

    /// Run the respawn sequence.  Returns `false` if one is already running.
    pub fn respawn(&mut self, host: &mut dyn RespawnHost) -> bool {
        self.run_respawn(host, true)
    }

    /// Start the explosion for a fatal collision.  Ignored while exploding or
    /// respawning.
    pub fn on_fatal_collision(&mut self, host: &mut dyn RespawnHost) -> bool {
        if self.is_respawning || self.explosion.is_some() {
            return false;
        }
        host.set_collision_enabled(false);
        host.set_body_visible(false);
        self.body_hidden = true;
        self.broadcast(host, RespawnPhase::OnCollision);
        self.explosion = Some(self.explosion_delay);
        true
    }

    /// Advance the explosion delay by `real_dt` unscaled seconds.
    pub fn tick(&mut self, real_dt: f32, host: &mut dyn RespawnHost) {
        let Some(remaining) = self.explosion.as_mut() else {
            return;
        };
        *remaining -= real_dt.max(0.0);
        if *remaining > 0.0 {
            return;
        }
        self.explosion = None;
        self.show_body(host);
        self.respawn(host);
    }

    /// Record a new checkpoint.  Ignored during a respawn or an explosion.
    pub fn on_checkpoint(&mut self, record: CheckpointRecord, host: &mut dyn RespawnHost) -> bool {
        if self.is_respawning || self.explosion.is_some() {
            return false;
        }
        self.checkpoint = record;
        self.broadcast(host, RespawnPhase::OnCheckpoint);
        true
    }

    /// Announce that the first spawn finished.  Only the first call broadcasts.
    pub fn finish_initial_spawn(&mut self, host: &mut dyn RespawnHost) -> bool {
        if self.initial_spawn_ended {
            return false;
        }
        self.initial_spawn_ended = true;
        self.broadcast(host, RespawnPhase::OnInitialSpawnEnded);
        true
    }

    /// Back to the level start: forget the checkpoint and the respawn count,
    /// then respawn without counting it.
    pub fn restart_level(&mut self, host: &mut dyn RespawnHost) -> bool {
        if self.is_respawning {
            return false;
        }
        self.checkpoint = self.level_start;
        self.respawn_count.reset();
        self.run_respawn(host, false)
    }

    fn run_respawn(&mut self, host: &mut dyn RespawnHost, count: bool) -> bool {
        if self.is_respawning {
            return false;
        }
        self.is_respawning = true;
        self.explosion = None;
        if count {
            self.respawn_count.add(1);
        }

        let mut signals = RespawnSignals::default();
        self.broadcast_with(host, RespawnPhase::BeforeRespawn, &mut signals);
        host.move_to_checkpoint(&self.checkpoint);
        host.set_collision_enabled(true);
        self.show_body(host);
        self.broadcast_with(host, RespawnPhase::OnRespawnStart, &mut signals);
        self.broadcast_with(host, RespawnPhase::OnRespawnEnd, &mut signals);
        self.is_respawning = false;

        if signals.respawn_requested() {
            debug!("[respawn] ignored respawn request made during the sequence");
        }
        true
    }

    fn show_body(&mut self, host: &mut dyn RespawnHost) {
        if self.body_hidden {
            host.set_body_visible(true);
            self.body_hidden = false;
        }
    }

    fn broadcast(&mut self, host: &mut dyn RespawnHost, phase: RespawnPhase) {
        let mut signals = RespawnSignals::default();
        self.broadcast_with(host, phase, &mut signals);
        // Out-of-band phases may ask for a respawn outright.
        if signals.respawn_requested() && !self.is_respawning {
            self.respawn(host);
        }
    }

    fn broadcast_with(
        &mut self,
        host: &mut dyn RespawnHost,
        phase: RespawnPhase,
        signals: &mut RespawnSignals,
    ) {
        let event = RespawnEvent {
            phase,
            respawn_count: self.respawn_count.current(),
        };
        host.broadcast(event, signals);
    }
}
