//! Rigid-body handle used by the flight model, and the orientation-follow
//! component.
//!
//! The flight model talks to a rocket only through [`RocketBody`].  The live
//! rocket implements it with [`EcsRocketBody`] over its Rapier components; the
//! shadow world wraps its own entity the same way, so both worlds run the
//! same launch and burn code.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

/// Operations the flight model needs from a rigid body.
pub trait RocketBody {
    /// Unit vector the rocket's nose points along (local +Y).
    fn forward(&self) -> Vec3;
    fn set_velocity(&mut self, linear: Vec3, angular: Vec3);
    /// Instantaneous impulse, applied at the next physics step.
    fn apply_impulse(&mut self, impulse: Vec3);
    /// Continuous force, held until replaced.  `Vec3::ZERO` clears it.
    fn apply_force(&mut self, force: Vec3);
    fn set_orientation_mode(&mut self, mode: OrientationMode);
}

// ── Orientation follow ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationMode {
    /// Nose follows the direction of travel.
    #[default]
    Velocity,
    /// Nose holds `heading` (aiming while charging).
    FixedHeading,
}

/// Rotates the rocket's transform towards a target each physics tick.
///
/// Rocket bodies lock rotation in Rapier; this component is the only writer
/// of their rotation.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct OrientationFollow {
    pub mode: OrientationMode,
    pub heading: Quat,
    /// Slerp rate (1/s).
    pub turn_rate: f32,
    /// Velocity-follow holds the current rotation below this speed.
    pub min_follow_speed: f32,
}

impl OrientationFollow {
    pub fn new(turn_rate: f32, min_follow_speed: f32) -> Self {
        Self {
            mode: OrientationMode::Velocity,
            heading: Quat::IDENTITY,
            turn_rate,
            min_follow_speed,
        }
    }

    /// Switch mode.  Entering `FixedHeading` captures `current` as the heading.
    pub fn set_mode(&mut self, mode: OrientationMode, current: Quat) {
        if mode == OrientationMode::FixedHeading && self.mode != OrientationMode::FixedHeading {
            self.heading = current;
        }
        self.mode = mode;
    }

    /// Rotation the rocket is turning towards.
    pub fn target(&self, current: Quat, velocity: Vec3) -> Quat {
        match self.mode {
            OrientationMode::FixedHeading => self.heading,
            OrientationMode::Velocity => {
                if velocity.length() < self.min_follow_speed {
                    current
                } else {
                    Quat::from_rotation_arc(Vec3::Y, velocity.normalize())
                }
            }
        }
    }

    /// Rotation after one tick of `dt` seconds.
    pub fn step(&self, current: Quat, velocity: Vec3, dt: f32) -> Quat {
        let target = self.target(current, velocity);
        let t = (self.turn_rate * dt).clamp(0.0, 1.0);
        current.slerp(target, t).normalize()
    }

    /// Tilt the held heading around the view axis (Z), limited to
    /// `max_tilt` radians either side of straight up.
    pub fn tilt_heading(&mut self, delta: f32, max_tilt: f32) {
        let nose = self.heading * Vec3::Y;
        let angle = (-nose.x).atan2(nose.y);
        let tilted = (angle + delta).clamp(-max_tilt, max_tilt);
        self.heading = Quat::from_rotation_z(tilted);
    }
}

// ── ECS adapter ───────────────────────────────────────────────────────────────

/// [`RocketBody`] over a rocket entity's components.
pub struct EcsRocketBody<'a> {
    pub rotation: Quat,
    pub velocity: &'a mut Velocity,
    pub impulse: &'a mut ExternalImpulse,
    pub force: &'a mut ExternalForce,
    pub orientation: &'a mut OrientationFollow,
}

impl RocketBody for EcsRocketBody<'_> {
    fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        self.velocity.linvel = linear;
        self.velocity.angvel = angular;
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.impulse.impulse += impulse;
    }

    fn apply_force(&mut self, force: Vec3) {
        self.force.force = force;
        self.force.torque = Vec3::ZERO;
    }

    fn set_orientation_mode(&mut self, mode: OrientationMode) {
        self.orientation.set_mode(mode, self.rotation);
    }
}

/// Records every call; stands in for a rigid body in unit tests.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockBody {
    pub forward: Vec3,
    pub linvel: Vec3,
    pub angvel: Vec3,
    pub impulses: Vec<Vec3>,
    pub force: Vec3,
    pub orientation: Option<OrientationMode>,
}

#[cfg(test)]
impl Default for MockBody {
    fn default() -> Self {
        Self {
            forward: Vec3::Y,
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
            impulses: Vec::new(),
            force: Vec3::ZERO,
            orientation: None,
        }
    }
}

#[cfg(test)]
impl RocketBody for MockBody {
    fn forward(&self) -> Vec3 {
        self.forward
    }
    fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        self.linvel = linear;
        self.angvel = angular;
    }
    fn apply_impulse(&mut self, impulse: Vec3) {
        self.impulses.push(impulse);
    }
    fn apply_force(&mut self, force: Vec3) {
        self.force = force;
    }
    fn set_orientation_mode(&mut self, mode: OrientationMode) {
        self.orientation = Some(mode);
    }
}
