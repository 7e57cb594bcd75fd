//! Bounded resource ledgers ("juice") and their change notifications.
//!
//! A [`ResourceLedger`] holds one scalar with optional bounds.  Mutations go
//! through [`ResourceLedger::add`] / [`ResourceLedger::subtract`], which only
//! succeed when the matching `can_*` predicate holds at the moment of the
//! call.  Every successful mutation is queued as a change and later published
//! as a [`LedgerChanged`] message keyed by the ledger's identifier, which is
//! what UI fill bars and ability gating subscribe to.
//!
//! ## Overflow rule (subtract shown, add is the mirror image)
//!
//! | Condition                                              | Result   |
//! |--------------------------------------------------------|----------|
//! | `v < 0` or `v` is NaN                                  | rejected |
//! | no `min`                                               | accepted |
//! | `current <= min`                                       | rejected |
//! | `current - v >= min`                                   | accepted |
//! | overshoot, clamping off                                | rejected |
//! | overshoot, clamping on, allowance `< 0`                | accepted |
//! | overshoot, clamping on, `current - v >= min - allowance` | accepted |
//! | overshoot, clamping on, `current - min <= allowance`   | accepted |
//! | otherwise                                              | rejected |
//!
//! Accepted overshoots are clamped to the bound when clamping is on.

use crate::config::RocketConfig;
use crate::respawn::{RespawnEvent, RespawnPhase};
use bevy::prelude::*;
use std::fmt::Debug;

/// Identifier of the juice ledger in [`LedgerChanged`] messages.
pub const JUICE_KEY: &str = "juice";

/// Identifier of the respawn counter in [`LedgerChanged`] messages.
pub const RESPAWN_COUNT_KEY: &str = "respawn_count";

// ── Scalar abstraction ────────────────────────────────────────────────────────

/// Scalar types a ledger can hold.
///
/// Implemented for `f32` (juice) and `i32` (counters).  Integer arithmetic
/// saturates rather than panicking on overflow.
pub trait LedgerScalar: Copy + PartialOrd + Debug + Send + Sync + 'static {
    const ZERO: Self;

    fn plus(self, other: Self) -> Self;
    fn minus(self, other: Self) -> Self;
    fn is_nan(self) -> bool;
    /// Lossy conversion used when publishing change notifications.
    fn to_f32(self) -> f32;
}

impl LedgerScalar for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn plus(self, other: Self) -> Self {
        self + other
    }
    #[inline]
    fn minus(self, other: Self) -> Self {
        self - other
    }
    #[inline]
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl LedgerScalar for i32 {
    const ZERO: Self = 0;

    #[inline]
    fn plus(self, other: Self) -> Self {
        self.saturating_add(other)
    }
    #[inline]
    fn minus(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
    #[inline]
    fn is_nan(self) -> bool {
        false
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

// ── Ledger ────────────────────────────────────────────────────────────────────

/// One overflow policy per bound.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundPolicy<T> {
    clamp: bool,
    /// Negative means unlimited (only meaningful when `clamp` is set).
    allowance: T,
}

/// A bounded scalar with overflow policy and change notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLedger<T: LedgerScalar> {
    key: &'static str,
    initial: T,
    current: T,
    min: Option<T>,
    max: Option<T>,
    min_policy: BoundPolicy<T>,
    max_policy: BoundPolicy<T>,
    banked: Option<T>,
    pending: Vec<T>,
}

impl<T: LedgerScalar> ResourceLedger<T> {
    /// Unbounded ledger starting at `initial`.
    pub fn new(key: &'static str, initial: T) -> Self {
        let strict = BoundPolicy {
            clamp: false,
            allowance: T::ZERO,
        };
        Self {
            key,
            initial,
            current: initial,
            min: None,
            max: None,
            min_policy: strict,
            max_policy: strict,
            banked: None,
            pending: Vec::new(),
        }
    }

    pub fn with_min(mut self, min: T) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: T) -> Self {
        self.max = Some(max);
        self
    }

    /// Allow subtractions to overshoot `min` by up to `allowance` (negative =
    /// unlimited), clamping the result back to `min`.
    pub fn clamp_on_overflow_min(mut self, allowance: T) -> Self {
        self.min_policy = BoundPolicy {
            clamp: true,
            allowance,
        };
        self
    }

    /// Mirror of [`Self::clamp_on_overflow_min`] for the upper bound.
    pub fn clamp_on_overflow_max(mut self, allowance: T) -> Self {
        self.max_policy = BoundPolicy {
            clamp: true,
            allowance,
        };
        self
    }

    #[inline]
    pub fn key(&self) -> &'static str {
        self.key
    }

    #[inline]
    pub fn current(&self) -> T {
        self.current
    }

    #[inline]
    pub fn initial(&self) -> T {
        self.initial
    }

    #[inline]
    pub fn min(&self) -> Option<T> {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Option<T> {
        self.max
    }

    #[inline]
    pub fn banked(&self) -> Option<T> {
        self.banked
    }

    /// Whether `subtract(v)` would succeed right now.
    pub fn can_subtract(&self, v: T) -> bool {
        if v.is_nan() || v < T::ZERO {
            return false;
        }
        let Some(min) = self.min else {
            return true;
        };
        if self.current <= min {
            return false;
        }
        let result = self.current.minus(v);
        if result >= min {
            return true;
        }
        let policy = self.min_policy;
        if !policy.clamp {
            return false;
        }
        if policy.allowance < T::ZERO {
            return true;
        }
        result >= min.minus(policy.allowance) || self.current.minus(min) <= policy.allowance
    }

    /// Whether `add(v)` would succeed right now.
    pub fn can_add(&self, v: T) -> bool {
        if v.is_nan() || v < T::ZERO {
            return false;
        }
        let Some(max) = self.max else {
            return true;
        };
        if self.current >= max {
            return false;
        }
        let result = self.current.plus(v);
        if result <= max {
            return true;
        }
        let policy = self.max_policy;
        if !policy.clamp {
            return false;
        }
        if policy.allowance < T::ZERO {
            return true;
        }
        result <= max.plus(policy.allowance) || max.minus(self.current) <= policy.allowance
    }

    /// Subtract `v` if allowed; returns whether the ledger changed.
    pub fn subtract(&mut self, v: T) -> bool {
        if !self.can_subtract(v) {
            return false;
        }
        let mut result = self.current.minus(v);
        if let Some(min) = self.min {
            if self.min_policy.clamp && result < min {
                result = min;
            }
        }
        self.write(result);
        true
    }

    /// Add `v` if allowed; returns whether the ledger changed.
    pub fn add(&mut self, v: T) -> bool {
        if !self.can_add(v) {
            return false;
        }
        let mut result = self.current.plus(v);
        if let Some(max) = self.max {
            if self.max_policy.clamp && result > max {
                result = max;
            }
        }
        self.write(result);
        true
    }

    /// Overwrite the value without consulting bounds.
    pub fn set(&mut self, value: T) {
        self.write(value);
    }

    /// Change the lower bound.  `current` is not renormalised.
    pub fn set_min(&mut self, min: Option<T>) {
        self.min = min;
    }

    /// Change the upper bound.  `current` is not renormalised.
    pub fn set_max(&mut self, max: Option<T>) {
        self.max = max;
    }

    /// Return to the initial value and forget any banked value.
    pub fn reset(&mut self) {
        self.banked = None;
        self.write(self.initial);
    }

    /// Remember the current value so a later respawn can return to it.
    pub fn bank(&mut self) {
        self.banked = Some(self.current);
    }

    /// Restore the banked value, if any.  Returns whether a value was restored.
    pub fn restore_banked(&mut self) -> bool {
        match self.banked {
            Some(value) => {
                self.write(value);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take every value written since the last drain, oldest first.
    pub fn drain_changes(&mut self) -> Vec<T> {
        std::mem::take(&mut self.pending)
    }

    fn write(&mut self, value: T) {
        self.current = value;
        self.pending.push(value);
    }
}

// ── ECS surface ───────────────────────────────────────────────────────────────

/// Published once per successful ledger mutation.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct LedgerChanged {
    pub key: &'static str,
    pub value: f32,
}

/// The juice economy gating slow motion.  Only the time-dilation controller
/// drains it; pickups top it up.
#[derive(Resource, Debug, Clone, PartialEq, Deref, DerefMut)]
pub struct JuiceLedger(pub ResourceLedger<f32>);

impl JuiceLedger {
    pub fn from_config(config: &RocketConfig) -> Self {
        Self(
            ResourceLedger::new(JUICE_KEY, config.juice_initial)
                .with_min(config.juice_min)
                .with_max(config.juice_max)
                .clamp_on_overflow_min(config.juice_overflow_allowance)
                .clamp_on_overflow_max(config.juice_overflow_allowance),
        )
    }
}

impl Default for JuiceLedger {
    fn default() -> Self {
        Self::from_config(&RocketConfig::default())
    }
}

/// Write queued changes of `ledger` as [`LedgerChanged`] messages.
pub fn publish_changes<T: LedgerScalar>(
    ledger: &mut ResourceLedger<T>,
    writer: &mut MessageWriter<LedgerChanged>,
) {
    let key = ledger.key();
    for value in ledger.drain_changes() {
        writer.write(LedgerChanged {
            key,
            value: value.to_f32(),
        });
    }
}

/// Startup system: rebuild the juice ledger from the loaded config.
pub fn init_juice_from_config(mut commands: Commands, config: Res<RocketConfig>) {
    commands.insert_resource(JuiceLedger::from_config(&config));
}

/// Publish juice changes.  Runs last in the variable-step tick so every
/// mutation made this frame is broadcast in order.
pub fn broadcast_juice_changes_system(
    mut juice: ResMut<JuiceLedger>,
    mut writer: MessageWriter<LedgerChanged>,
) {
    if !juice.has_pending_changes() {
        return;
    }
    publish_changes(&mut juice.0, &mut writer);
}

/// Bank juice at checkpoints and restore the banked amount on respawn.
pub fn juice_respawn_reaction_system(
    mut events: MessageReader<RespawnEvent>,
    mut juice: ResMut<JuiceLedger>,
) {
    for event in events.read() {
        match event.phase {
            RespawnPhase::OnCheckpoint => {
                juice.bank();
                debug!("[juice] banked {:.1} at checkpoint", juice.current());
            }
            RespawnPhase::BeforeRespawn => {
                if !juice.restore_banked() {
                    juice.reset();
                }
            }
            _ => {}
        }
    }
}
