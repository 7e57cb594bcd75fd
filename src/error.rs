//! Error types for configuration and shadow-world setup.
//!
//! Gameplay paths never return these: a ledger mutation that cannot happen
//! returns `false`, and a collaborator that is not ready yet makes the system
//! skip its tick.  Errors are reserved for setup work where the caller can do
//! something meaningful with the failure (fall back to defaults, retry the
//! shadow-world build next frame).
//!
//! ## Usage
//!
//! ```rust
//! use liftoff::config::RocketConfig;
//! use liftoff::error::RocketResult;
//!
//! fn check(config: &RocketConfig) -> RocketResult<()> {
//!     config.validate()?;
//!     Ok(())
//! }
//! # check(&RocketConfig::default()).unwrap();
//! ```

use std::fmt;

/// Top-level error enum for the rocket core.
#[derive(Debug, Clone, PartialEq)]
pub enum RocketError {
    /// A tunable is outside its safe operating range.
    UnsafeConstant {
        /// Name of the config key (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },

    /// The level has no solid geometry to copy into the shadow world yet.
    EmptyLevelGeometry,

    /// The shadow world was asked to predict before it was built.
    ShadowWorldNotReady,

    /// `assets/rocket.toml` exists but could not be parsed.
    ConfigParse {
        /// Path of the file that failed.
        path: String,
        /// Parser message.
        message: String,
    },
}

impl fmt::Display for RocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RocketError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "config value '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
            RocketError::EmptyLevelGeometry => {
                write!(f, "no solid level geometry available for the shadow world")
            }
            RocketError::ShadowWorldNotReady => {
                write!(f, "shadow world has not been built yet")
            }
            RocketError::ConfigParse { path, message } => {
                write!(f, "failed to parse {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for RocketError {}

/// Convenience alias: a `Result` using `RocketError` as the error type.
pub type RocketResult<T> = Result<T, RocketError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error unless `value` lies strictly between `low` and `high`.
pub fn require_open_range(
    name: &'static str,
    value: f32,
    low: f32,
    high: f32,
    safe_range: &'static str,
) -> RocketResult<()> {
    if value > low && value < high {
        Ok(())
    } else {
        Err(RocketError::UnsafeConstant {
            name,
            value,
            safe_range,
        })
    }
}

/// Returns an error if `value` is not strictly positive (NaN included).
pub fn require_positive(name: &'static str, value: f32) -> RocketResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(RocketError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Returns an error if `value` is negative (NaN included).
pub fn require_non_negative(name: &'static str, value: f32) -> RocketResult<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(RocketError::UnsafeConstant {
            name,
            value,
            safe_range: "[0.0, ∞)",
        })
    }
}
