//! Runtime flight configuration loaded from `assets/rocket.toml`.
//!
//! [`RocketConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_rocket_config`] reads
//! `assets/rocket.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the values you care about.
//!
//! ## Usage in systems
//!
//! Add `config: Res<RocketConfig>` to any system parameter list and read values
//! with `config.engine_burn_force`, `config.slow_mo_scale`, etc.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `RocketConfig::default()`.

use crate::constants::*;
use crate::error::{
    require_non_negative, require_open_range, require_positive, RocketError, RocketResult,
};
use bevy::prelude::*;
use serde::Deserialize;

/// Default location of the override file, relative to the working directory.
pub const CONFIG_PATH: &str = "assets/rocket.toml";

/// Runtime-tunable flight and gameplay configuration.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RocketConfig {
    // ── Clock ─────────────────────────────────────────────────────────────────
    pub base_fixed_step: f32,

    // ── Flight: Launch ────────────────────────────────────────────────────────
    pub min_charge_force: f32,
    pub player_charge_force: f32,
    pub charge_delta_threshold: f32,

    // ── Flight: Engine burn ───────────────────────────────────────────────────
    pub engine_burn_time: f32,
    pub engine_burn_force: f32,

    // ── Rocket body ───────────────────────────────────────────────────────────
    pub rocket_mass: f32,
    pub rocket_collider_radius: f32,
    pub rocket_collider_half_height: f32,
    pub rocket_linear_damping: f32,
    pub orientation_turn_rate: f32,
    pub orientation_min_follow_speed: f32,

    // ── Time dilation ─────────────────────────────────────────────────────────
    pub slow_mo_scale: f32,
    pub slow_mo_transition_time: f32,
    pub slow_mo_drain_per_second: f32,

    // ── Juice ─────────────────────────────────────────────────────────────────
    pub juice_initial: f32,
    pub juice_min: f32,
    pub juice_max: f32,
    pub juice_overflow_allowance: f32,
    pub juice_pickup_amount: f32,

    // ── Respawn ───────────────────────────────────────────────────────────────
    pub explosion_delay_secs: f32,
    pub level_start_position: [f32; 3],

    // ── Prediction ────────────────────────────────────────────────────────────
    pub prediction_steps: usize,

    // ── Input glue ────────────────────────────────────────────────────────────
    pub keyboard_charge_rate: f32,
    pub gamepad_trigger_deadzone: f32,
    pub heading_tilt_speed: f32,
    pub max_heading_tilt: f32,
}

impl Default for RocketConfig {
    fn default() -> Self {
        Self {
            // Clock
            base_fixed_step: BASE_FIXED_STEP,
            // Launch
            min_charge_force: MIN_CHARGE_FORCE,
            player_charge_force: PLAYER_CHARGE_FORCE,
            charge_delta_threshold: CHARGE_DELTA_THRESHOLD,
            // Engine burn
            engine_burn_time: ENGINE_BURN_TIME,
            engine_burn_force: ENGINE_BURN_FORCE,
            // Rocket body
            rocket_mass: ROCKET_MASS,
            rocket_collider_radius: ROCKET_COLLIDER_RADIUS,
            rocket_collider_half_height: ROCKET_COLLIDER_HALF_HEIGHT,
            rocket_linear_damping: ROCKET_LINEAR_DAMPING,
            orientation_turn_rate: ORIENTATION_TURN_RATE,
            orientation_min_follow_speed: ORIENTATION_MIN_FOLLOW_SPEED,
            // Time dilation
            slow_mo_scale: SLOW_MO_SCALE,
            slow_mo_transition_time: SLOW_MO_TRANSITION_TIME,
            slow_mo_drain_per_second: SLOW_MO_DRAIN_PER_SECOND,
            // Juice
            juice_initial: JUICE_INITIAL,
            juice_min: JUICE_MIN,
            juice_max: JUICE_MAX,
            juice_overflow_allowance: JUICE_OVERFLOW_ALLOWANCE,
            juice_pickup_amount: JUICE_PICKUP_AMOUNT,
            // Respawn
            explosion_delay_secs: EXPLOSION_DELAY_SECS,
            level_start_position: LEVEL_START_POSITION,
            // Prediction
            prediction_steps: PREDICTION_STEPS,
            // Input glue
            keyboard_charge_rate: KEYBOARD_CHARGE_RATE,
            gamepad_trigger_deadzone: GAMEPAD_TRIGGER_DEADZONE,
            heading_tilt_speed: HEADING_TILT_SPEED,
            max_heading_tilt: MAX_HEADING_TILT,
        }
    }
}

impl RocketConfig {
    /// Parse a TOML document, filling missing keys from the defaults.
    pub fn from_toml_str(path: &str, contents: &str) -> RocketResult<Self> {
        toml::from_str::<RocketConfig>(contents).map_err(|e| RocketError::ConfigParse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Reject values that would break an invariant downstream (a zero fixed
    /// step, a slow-mo scale that makes the transition rule divide by zero,
    /// a prediction with no steps, ...).
    pub fn validate(&self) -> RocketResult<()> {
        require_positive("base_fixed_step", self.base_fixed_step)?;
        require_non_negative("min_charge_force", self.min_charge_force)?;
        require_non_negative("player_charge_force", self.player_charge_force)?;
        require_positive("charge_delta_threshold", self.charge_delta_threshold)?;
        require_non_negative("engine_burn_time", self.engine_burn_time)?;
        require_non_negative("engine_burn_force", self.engine_burn_force)?;
        require_positive("rocket_mass", self.rocket_mass)?;
        require_positive("rocket_collider_radius", self.rocket_collider_radius)?;
        require_non_negative(
            "rocket_collider_half_height",
            self.rocket_collider_half_height,
        )?;
        require_open_range("slow_mo_scale", self.slow_mo_scale, 0.0, 1.0, "(0.0, 1.0)")?;
        require_non_negative("slow_mo_transition_time", self.slow_mo_transition_time)?;
        require_non_negative("slow_mo_drain_per_second", self.slow_mo_drain_per_second)?;
        require_non_negative("explosion_delay_secs", self.explosion_delay_secs)?;
        if self.juice_max < self.juice_min {
            return Err(RocketError::UnsafeConstant {
                name: "juice_max",
                value: self.juice_max,
                safe_range: "[juice_min, ∞)",
            });
        }
        if self.prediction_steps == 0 {
            return Err(RocketError::UnsafeConstant {
                name: "prediction_steps",
                value: 0.0,
                safe_range: "[1, ∞)",
            });
        }
        Ok(())
    }

    /// Level start as a vector.
    #[inline]
    pub fn level_start(&self) -> Vec3 {
        Vec3::from_array(self.level_start_position)
    }
}

/// Startup system: attempt to load `assets/rocket.toml` and overwrite the
/// `RocketConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  Parse or validation errors
/// are printed to stderr but do not abort the game.  A missing file is
/// silently ignored (defaults are already in place from `init_resource`).
pub fn load_rocket_config(mut config: ResMut<RocketConfig>) {
    let path = CONFIG_PATH;
    match std::fs::read_to_string(path) {
        Ok(contents) => match RocketConfig::from_toml_str(path, &contents) {
            Ok(loaded) => match loaded.validate() {
                Ok(()) => {
                    *config = loaded;
                    println!("✓ Loaded rocket config from {path}");
                }
                Err(e) => {
                    eprintln!("⚠ Rejected {path}: {e}; using defaults");
                }
            },
            Err(e) => {
                eprintln!("⚠ {e}; using defaults");
            }
        },
        Err(_) => {
            // File not present; defaults are already in place; not an error.
            println!("ℹ No {path} found; using compiled defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(RocketConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let loaded = RocketConfig::from_toml_str(
            "inline",
            "engine_burn_force = 42.0\nprediction_steps = 12\n",
        )
        .unwrap();
        assert_eq!(loaded.engine_burn_force, 42.0);
        assert_eq!(loaded.prediction_steps, 12);
        assert_eq!(loaded.slow_mo_scale, SLOW_MO_SCALE);
        assert_eq!(loaded.juice_max, JUICE_MAX);
    }

    #[test]
    fn shipped_file_matches_defaults() {
        let shipped =
            RocketConfig::from_toml_str(CONFIG_PATH, include_str!("../assets/rocket.toml"))
                .unwrap();
        assert_eq!(shipped, RocketConfig::default());
    }

    #[test]
    fn malformed_toml_reports_path() {
        let err = RocketConfig::from_toml_str("assets/rocket.toml", "engine_burn_force = [")
            .unwrap_err();
        assert!(matches!(err, RocketError::ConfigParse { .. }));
        assert!(err.to_string().contains("assets/rocket.toml"));
    }

    #[test]
    fn slow_mo_scale_of_one_is_rejected() {
        let config = RocketConfig {
            slow_mo_scale: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_prediction_steps_is_rejected() {
        let config = RocketConfig {
            prediction_steps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
