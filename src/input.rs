//! Keyboard and gamepad glue for the binary.
//!
//! ## Pipeline (runs in order every `Update` frame, in [`crate::RocketSet::Input`])
//!
//! 1. [`rocket_intent_clear_system`]: resets [`RocketIntent`].
//! 2. [`keyboard_to_intent_system`]: Space / Shift / A-D / R / P.
//! 3. [`gamepad_to_intent_system`]: right trigger, left trigger, left stick, Start / Select.
//! 4. [`apply_rocket_intent_system`]: turns the intent into core messages.
//!
//! Only step 4 talks to the core, so tests fill [`RocketIntent`] directly and
//! run it alone.  Steps 2 and 3 need `ButtonInput`, which only the windowed
//! app has; [`RocketInputPlugin`] is therefore added by `main.rs` only.
//!
//! | Control | Keyboard | Gamepad |
//! |---------|----------|---------|
//! | Charge (release to launch) | Space (ramps up) | Right trigger (analog) or South |
//! | Slow motion | Left Shift | Left trigger |
//! | Aim while charging | A / D | Left stick X |
//! | Pause flight | P | Start |
//! | Restart level | R | Select |

use crate::config::RocketConfig;
use crate::dilation::DilationRequest;
use crate::flight::{ChargeInput, FlightCommand, FlightController, FlightMode, OrientationFollow};
use crate::respawn::LifecycleRequest;
use bevy::prelude::*;

/// Device-independent input for one frame.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct RocketIntent {
    /// Digital charge button held; ramps the charge level.
    pub charge_held: bool,
    /// Analog charge level; overrides the digital ramp when present.
    pub charge_analog: Option<f32>,
    pub slow_mo: bool,
    /// Heading tilt direction, `-1..=1` (positive = counter-clockwise).
    pub tilt: f32,
    pub toggle_pause: bool,
    pub restart: bool,
}

/// Input state carried between frames.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct RocketInputState {
    pub charge_level: f32,
    pub slow_mo_held: bool,
    pub paused: bool,
}

/// Digital charge ramp: rises at `rate` per second while held, drops to zero
/// on release.
pub fn ramp_charge(current: f32, held: bool, rate: f32, dt: f32) -> f32 {
    if !held {
        return 0.0;
    }
    (current + rate * dt).clamp(0.0, 1.0)
}

/// Map a raw trigger value to a charge level, rescaling past the deadzone.
pub fn trigger_level(raw: f32, deadzone: f32) -> f32 {
    if raw <= deadzone {
        return 0.0;
    }
    let span = 1.0 - deadzone;
    if span <= 0.0 {
        return 1.0;
    }
    ((raw - deadzone) / span).clamp(0.0, 1.0)
}

// ── Step 1: Clear ─────────────────────────────────────────────────────────────

pub fn rocket_intent_clear_system(mut intent: ResMut<RocketIntent>) {
    *intent = RocketIntent::default();
}

// ── Step 2: Keyboard ──────────────────────────────────────────────────────────

pub fn keyboard_to_intent_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut intent: ResMut<RocketIntent>,
) {
    intent.charge_held |= keys.pressed(KeyCode::Space);
    intent.slow_mo |= keys.pressed(KeyCode::ShiftLeft);
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        intent.tilt += 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        intent.tilt -= 1.0;
    }
    intent.toggle_pause |= keys.just_pressed(KeyCode::KeyP);
    intent.restart |= keys.just_pressed(KeyCode::KeyR);
}

// ── Step 3: Gamepad ───────────────────────────────────────────────────────────

/// Reads the first connected gamepad.
pub fn gamepad_to_intent_system(
    gamepads: Query<&Gamepad>,
    mut intent: ResMut<RocketIntent>,
    config: Res<RocketConfig>,
) {
    let Some(gamepad) = gamepads.iter().next() else {
        return;
    };

    let trigger = gamepad.get(GamepadButton::RightTrigger2).unwrap_or(0.0);
    let level = trigger_level(trigger, config.gamepad_trigger_deadzone);
    if level > 0.0 {
        intent.charge_analog = Some(level);
    }
    intent.charge_held |= gamepad.pressed(GamepadButton::South);
    intent.slow_mo |= gamepad.pressed(GamepadButton::LeftTrigger2);

    let stick_x = gamepad.get(GamepadAxis::LeftStickX).unwrap_or(0.0);
    if stick_x.abs() > config.gamepad_trigger_deadzone {
        intent.tilt -= stick_x;
    }
    intent.toggle_pause |= gamepad.just_pressed(GamepadButton::Start);
    intent.restart |= gamepad.just_pressed(GamepadButton::Select);
}

// ── Step 4: Apply ─────────────────────────────────────────────────────────────

/// Convert [`RocketIntent`] into [`ChargeInput`], [`DilationRequest`],
/// [`FlightCommand`] and [`LifecycleRequest`] messages, and tilt the aim of
/// a charging rocket.
#[allow(clippy::too_many_arguments)]
pub fn apply_rocket_intent_system(
    intent: Res<RocketIntent>,
    mut state: ResMut<RocketInputState>,
    real_time: Res<Time<Real>>,
    config: Res<RocketConfig>,
    mut charge: MessageWriter<ChargeInput>,
    mut dilation: MessageWriter<DilationRequest>,
    mut flight_commands: MessageWriter<FlightCommand>,
    mut lifecycle: MessageWriter<LifecycleRequest>,
    mut rockets: Query<(&FlightController, &mut OrientationFollow)>,
) {
    let dt = real_time.delta_secs();

    let level = match intent.charge_analog {
        Some(analog) => analog,
        None => ramp_charge(
            state.charge_level,
            intent.charge_held,
            config.keyboard_charge_rate,
            dt,
        ),
    };
    if level > 0.0 || state.charge_level > 0.0 {
        charge.write(ChargeInput { level });
    }
    state.charge_level = level;

    if intent.slow_mo != state.slow_mo_held {
        dilation.write(if intent.slow_mo {
            DilationRequest::Engage
        } else {
            DilationRequest::Release
        });
        state.slow_mo_held = intent.slow_mo;
    }

    let tilt = intent.tilt.clamp(-1.0, 1.0);
    if tilt != 0.0 {
        for (flight, mut follow) in rockets.iter_mut() {
            if flight.mode() == FlightMode::Charging {
                follow.tilt_heading(
                    tilt * config.heading_tilt_speed * dt,
                    config.max_heading_tilt,
                );
            }
        }
    }

    if intent.toggle_pause {
        state.paused = !state.paused;
        flight_commands.write(if state.paused {
            FlightCommand::Pause
        } else {
            FlightCommand::Resume
        });
    }
    if intent.restart {
        lifecycle.write(LifecycleRequest::RestartLevel);
    }
}

/// Keyboard / gamepad input.  Requires `ButtonInput<KeyCode>` (DefaultPlugins).
pub struct RocketInputPlugin;

impl Plugin for RocketInputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RocketIntent>()
            .init_resource::<RocketInputState>()
            .add_systems(
                Update,
                (
                    rocket_intent_clear_system,
                    keyboard_to_intent_system,
                    gamepad_to_intent_system,
                    apply_rocket_intent_system,
                )
                    .chain()
                    .in_set(crate::RocketSet::Input),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(RocketConfig::default());
        app.init_resource::<RocketInputState>();
        app.add_message::<ChargeInput>();
        app.add_message::<DilationRequest>();
        app.add_message::<FlightCommand>();
        app.add_message::<LifecycleRequest>();
        app.add_systems(Update, apply_rocket_intent_system);
        app
    }

    fn run_apply(app: &mut App, intent: RocketIntent) {
        app.insert_resource(intent);
        app.update();
    }

    fn drain<M: Message>(app: &mut App) -> Vec<M> {
        app.world_mut().resource_mut::<Messages<M>>().drain().collect()
    }

    #[test]
    fn ramp_rises_and_resets() {
        let mut level = 0.0;
        for _ in 0..10 {
            level = ramp_charge(level, true, 1.2, 0.1);
        }
        assert_eq!(level, 1.0, "ramp saturates at full charge");
        assert_eq!(ramp_charge(level, false, 1.2, 0.1), 0.0);
    }

    #[test]
    fn trigger_deadzone_is_rescaled() {
        assert_eq!(trigger_level(0.04, 0.05), 0.0);
        assert!((trigger_level(0.525, 0.05) - 0.5).abs() < 1e-6);
        assert_eq!(trigger_level(1.0, 0.05), 1.0);
    }

    #[test]
    fn analog_charge_then_release_sends_zero_once() {
        let mut app = build_test_app();
        run_apply(
            &mut app,
            RocketIntent {
                charge_analog: Some(0.6),
                ..Default::default()
            },
        );
        assert_eq!(drain::<ChargeInput>(&mut app), vec![ChargeInput { level: 0.6 }]);

        run_apply(&mut app, RocketIntent::default());
        assert_eq!(drain::<ChargeInput>(&mut app), vec![ChargeInput { level: 0.0 }]);

        run_apply(&mut app, RocketIntent::default());
        assert!(drain::<ChargeInput>(&mut app).is_empty(), "idle sends nothing");
    }

    #[test]
    fn slow_mo_edges_become_requests() {
        let mut app = build_test_app();
        let held = RocketIntent {
            slow_mo: true,
            ..Default::default()
        };
        run_apply(&mut app, held.clone());
        run_apply(&mut app, held);
        run_apply(&mut app, RocketIntent::default());
        assert_eq!(
            drain::<DilationRequest>(&mut app),
            vec![DilationRequest::Engage, DilationRequest::Release]
        );
    }

    #[test]
    fn pause_toggles_and_restart_requests() {
        let mut app = build_test_app();
        let toggle = RocketIntent {
            toggle_pause: true,
            ..Default::default()
        };
        run_apply(&mut app, toggle.clone());
        run_apply(&mut app, toggle);
        run_apply(
            &mut app,
            RocketIntent {
                restart: true,
                ..Default::default()
            },
        );
        assert_eq!(
            drain::<FlightCommand>(&mut app),
            vec![FlightCommand::Pause, FlightCommand::Resume]
        );
        assert_eq!(
            drain::<LifecycleRequest>(&mut app),
            vec![LifecycleRequest::RestartLevel]
        );
    }
}
