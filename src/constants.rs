//! Centralised flight and gameplay constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::RocketConfig::default`] is built from these values, and
//! `assets/rocket.toml` can override any of them at startup.
//!
//! ## Tuning guidance
//!
//! Each constant notes the observable consequence of changing it.  After
//! editing, run the headless test suite to confirm flight behaviour has not
//! regressed.

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Physics step at normal speed (seconds).
///
/// The live fixed step is always `BASE_FIXED_STEP * current time scale`, so
/// slow motion keeps the same number of physics steps per real second.
pub const BASE_FIXED_STEP: f32 = 1.0 / 60.0;

// ── Flight: Launch ────────────────────────────────────────────────────────────

/// Impulse (N·s) applied by even the weakest launch.
///
/// Keeps a tap-and-release hop from feeling dead.
pub const MIN_CHARGE_FORCE: f32 = 3.0;

/// Additional launch impulse (N·s) at full charge (`charge_level = 1.0`).
pub const PLAYER_CHARGE_FORCE: f32 = 9.0;

/// Drop in charge level between two consecutive inputs that counts as a
/// release and fires the launch.
///
/// Lower values make analog triggers fire on small relaxations of pressure;
/// higher values require a sharper release.
pub const CHARGE_DELTA_THRESHOLD: f32 = 0.1;

// ── Flight: Engine burn ───────────────────────────────────────────────────────

/// Burn duration (seconds) at full charge; scales linearly with charge.
pub const ENGINE_BURN_TIME: f32 = 0.6;

/// Initial burn force (N) at full charge; eases to zero over the burn.
pub const ENGINE_BURN_FORCE: f32 = 20.0;

// ── Rocket body ───────────────────────────────────────────────────────────────

/// Rocket mass (kg), set explicitly so impulse tuning is independent of the
/// collider shape.
pub const ROCKET_MASS: f32 = 1.0;

/// Capsule radius of the rocket collider (m).
pub const ROCKET_COLLIDER_RADIUS: f32 = 0.35;

/// Half height of the capsule's cylindrical segment (m).
pub const ROCKET_COLLIDER_HALF_HEIGHT: f32 = 0.5;

/// Linear damping applied to the rocket body.  Also applied to the shadow
/// rocket so predictions match.
pub const ROCKET_LINEAR_DAMPING: f32 = 0.05;

/// Slerp rate (1/s) used by the orientation-follow component.
///
/// Higher values snap the nose to the target direction faster.
pub const ORIENTATION_TURN_RATE: f32 = 10.0;

/// Below this speed (m/s) velocity-follow keeps the current heading instead
/// of chasing a noisy direction.
pub const ORIENTATION_MIN_FOLLOW_SPEED: f32 = 0.5;

// ── Time dilation ─────────────────────────────────────────────────────────────

/// Clock scale while slow motion is fully engaged.  Must be in `(0, 1)`.
pub const SLOW_MO_SCALE: f32 = 0.25;

/// Real seconds for a full `1.0 ↔ SLOW_MO_SCALE` transition.  Partial
/// transitions take proportionally less time.
pub const SLOW_MO_TRANSITION_TIME: f32 = 0.3;

/// Juice drained per real second while slow motion is engaged.
pub const SLOW_MO_DRAIN_PER_SECOND: f32 = 25.0;

// ── Juice ─────────────────────────────────────────────────────────────────────

/// Juice at level start and after a level restart.
pub const JUICE_INITIAL: f32 = 100.0;

/// Lower bound of the juice ledger.
pub const JUICE_MIN: f32 = 0.0;

/// Upper bound of the juice ledger.
pub const JUICE_MAX: f32 = 100.0;

/// How far a clamped juice mutation may overshoot a bound before it is
/// rejected.  Negative means unlimited.
pub const JUICE_OVERFLOW_ALLOWANCE: f32 = 10.0;

/// Juice granted by one pickup.
pub const JUICE_PICKUP_AMOUNT: f32 = 25.0;

// ── Respawn ───────────────────────────────────────────────────────────────────

/// Real seconds between a fatal collision and the respawn.
///
/// Measured on the unscaled clock so death always takes the same wall time
/// regardless of slow motion.
pub const EXPLOSION_DELAY_SECS: f32 = 1.2;

/// Spawn point used before any checkpoint has been reached.
pub const LEVEL_START_POSITION: [f32; 3] = [0.0, 1.5, 0.0];

// ── Prediction ────────────────────────────────────────────────────────────────

/// Number of shadow-world steps per prediction (`N`).
///
/// At 60 Hz, 90 steps previews 1.5 s of flight.  Cost grows linearly.
pub const PREDICTION_STEPS: usize = 90;

// ── Input glue ────────────────────────────────────────────────────────────────

/// Charge gained per real second while the digital charge key is held.
pub const KEYBOARD_CHARGE_RATE: f32 = 1.2;

/// Analog trigger values below this are treated as released.
pub const GAMEPAD_TRIGGER_DEADZONE: f32 = 0.05;

/// Heading tilt speed (rad/s) while aiming a charge.
pub const HEADING_TILT_SPEED: f32 = 1.6;

/// Maximum heading tilt away from straight up (rad).
pub const MAX_HEADING_TILT: f32 = 1.3;
