//! One-shot juice pickups and level-restart handling.
//!
//! A pickup moves through three states:
//!
//! ```text
//! Available ──touch──▶ Consumed ──checkpoint──▶ Banked (gone for good)
//!     ▲                    │
//!     └──────respawn───────┘
//! ```
//!
//! so dying gives back the pickups collected since the last checkpoint, just
//! as the juice ledger rolls back to its banked value.

use crate::ledger::{JuiceLedger, ResourceLedger};
use crate::respawn::{LifecycleRequest, RespawnEvent, RespawnPhase};
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickupState {
    #[default]
    Available,
    /// Collected since the last checkpoint.
    Consumed,
    /// Collected before the last checkpoint.
    Banked,
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct JuicePickup {
    pub amount: f32,
    pub state: PickupState,
}

impl JuicePickup {
    pub fn new(amount: f32) -> Self {
        Self {
            amount,
            state: PickupState::Available,
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.state == PickupState::Available
    }

    /// Add this pickup's juice.  A full ledger leaves the pickup in place.
    pub fn try_consume(&mut self, juice: &mut ResourceLedger<f32>) -> bool {
        if !self.is_available() || !juice.add(self.amount) {
            return false;
        }
        self.state = PickupState::Consumed;
        true
    }

    pub fn bank(&mut self) {
        if self.state == PickupState::Consumed {
            self.state = PickupState::Banked;
        }
    }

    pub fn restore(&mut self) {
        if self.state == PickupState::Consumed {
            self.state = PickupState::Available;
        }
    }
}

/// The rocket touched a pickup.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupTouched {
    pub pickup: Entity,
}

pub fn pickup_touch_system(
    mut touches: MessageReader<PickupTouched>,
    mut pickups: Query<&mut JuicePickup>,
    mut juice: ResMut<JuiceLedger>,
) {
    for touch in touches.read() {
        let Ok(mut pickup) = pickups.get_mut(touch.pickup) else {
            continue;
        };
        if pickup.try_consume(&mut juice.0) {
            info!(
                "[pickup] +{:.0} juice (now {:.0})",
                pickup.amount,
                juice.current()
            );
        }
    }
}

/// Bank consumed pickups at checkpoints; restore them on respawn.
pub fn pickup_respawn_reaction_system(
    mut events: MessageReader<RespawnEvent>,
    mut pickups: Query<&mut JuicePickup>,
) {
    for event in events.read() {
        match event.phase {
            RespawnPhase::OnCheckpoint => pickups.iter_mut().for_each(|mut p| p.bank()),
            RespawnPhase::BeforeRespawn => pickups.iter_mut().for_each(|mut p| p.restore()),
            _ => {}
        }
    }
}

/// On `RestartLevel`, put juice back to its initial value and every pickup
/// back in play.  Runs before the coordinator handles the same request.
pub fn level_restart_system(
    mut requests: MessageReader<LifecycleRequest>,
    mut juice: ResMut<JuiceLedger>,
    mut pickups: Query<&mut JuicePickup>,
) {
    let restarts = requests
        .read()
        .filter(|r| matches!(r, LifecycleRequest::RestartLevel))
        .count();
    if restarts == 0 {
        return;
    }
    juice.reset();
    for mut pickup in pickups.iter_mut() {
        pickup.state = PickupState::Available;
    }
}

/// Hide pickups that are not available.
pub fn pickup_visibility_system(
    mut pickups: Query<(&JuicePickup, &mut Visibility), Changed<JuicePickup>>,
) {
    for (pickup, mut visibility) in pickups.iter_mut() {
        *visibility = if pickup.is_available() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(current: f32) -> ResourceLedger<f32> {
        ResourceLedger::new("juice", current)
            .with_min(0.0)
            .with_max(100.0)
            .clamp_on_overflow_max(10.0)
    }

    #[test]
    fn consume_adds_juice_once() {
        let mut pickup = JuicePickup::new(25.0);
        let mut juice = ledger(50.0);
        assert!(pickup.try_consume(&mut juice));
        assert!(!pickup.try_consume(&mut juice));
        assert_eq!(juice.current(), 75.0);
    }

    #[test]
    fn full_ledger_leaves_pickup_available() {
        let mut pickup = JuicePickup::new(25.0);
        let mut juice = ledger(100.0);
        assert!(!pickup.try_consume(&mut juice));
        assert!(pickup.is_available());
    }

    #[test]
    fn consumed_since_checkpoint_returns_on_respawn() {
        let mut banked = JuicePickup::new(25.0);
        let mut recent = JuicePickup::new(25.0);
        let mut juice = ledger(0.0);
        banked.try_consume(&mut juice);
        banked.bank();
        recent.try_consume(&mut juice);

        banked.restore();
        recent.restore();
        assert_eq!(banked.state, PickupState::Banked);
        assert_eq!(recent.state, PickupState::Available);
    }

    #[test]
    fn restart_resets_juice_and_pickups() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(JuiceLedger::default());
        app.add_message::<LifecycleRequest>();
        app.add_systems(Update, level_restart_system);
        let pickup = app
            .world_mut()
            .spawn(JuicePickup {
                amount: 25.0,
                state: PickupState::Banked,
            })
            .id();
        app.world_mut().resource_mut::<JuiceLedger>().set(3.0);

        app.world_mut().write_message(LifecycleRequest::RestartLevel);
        app.update();

        assert!(app
            .world()
            .entity(pickup)
            .get::<JuicePickup>()
            .unwrap()
            .is_available());
        let juice = app.world().resource::<JuiceLedger>();
        assert_eq!(juice.current(), juice.initial());
    }
}
