//! Time dilation ("slow-mo"): smooth global clock scaling paid for in juice.
//!
//! [`TimeDilation`] owns the current clock scale.  Every variable-step tick
//! [`dilation_tick_system`] advances it on the *unscaled* clock and writes the
//! result to Bevy's clocks:
//!
//! - `Time<Virtual>` relative speed = `current_scale`
//! - `Time<Fixed>` timestep = `base_fixed_step * current_scale`
//!
//! Scaling both together keeps the number of physics steps per real second
//! constant, so slow motion stays as smooth as normal play.
//!
//! Transitions take `transition_time * |current - target| / |1 - slow_scale|`
//! real seconds, so a partial transition is proportionally shorter.

use crate::config::RocketConfig;
use crate::ledger::{JuiceLedger, ResourceLedger};
use crate::respawn::{RespawnEvent, RespawnPhase};
use bevy::prelude::*;

/// The subset of [`RocketConfig`] the dilation controller reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DilationTuning {
    pub slow_scale: f32,
    pub transition_time: f32,
    pub drain_per_second: f32,
    pub base_fixed_step: f32,
}

impl DilationTuning {
    pub fn from_config(config: &RocketConfig) -> Self {
        Self {
            slow_scale: config.slow_mo_scale,
            transition_time: config.slow_mo_transition_time,
            drain_per_second: config.slow_mo_drain_per_second,
            base_fixed_step: config.base_fixed_step,
        }
    }

    /// Real seconds to move the clock from `from` to `to`.
    pub fn transition_duration(&self, from: f32, to: f32) -> f32 {
        let span = (1.0 - self.slow_scale).abs();
        if span <= f32::EPSILON {
            return 0.0;
        }
        self.transition_time * (from - to).abs() / span
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    from: f32,
    target: f32,
    duration: f32,
    elapsed: f32,
}

/// What one tick wrote to the clocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSample {
    pub scale: f32,
    pub fixed_step: f32,
    /// The juice ran out during this tick and slow motion ended.
    pub exhausted: bool,
}

/// Global clock-scale controller.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct TimeDilation {
    pub tuning: DilationTuning,
    current_scale: f32,
    transition: Option<Transition>,
    engaged: bool,
    trigger_held: bool,
    input_locked: bool,
}

impl TimeDilation {
    pub fn new(tuning: DilationTuning) -> Self {
        Self {
            tuning,
            current_scale: 1.0,
            transition: None,
            engaged: false,
            trigger_held: false,
            input_locked: false,
        }
    }

    #[inline]
    pub fn current_scale(&self) -> f32 {
        self.current_scale
    }

    /// Target of the running transition, or the current scale when settled.
    pub fn target_scale(&self) -> f32 {
        self.transition
            .map(|t| t.target)
            .unwrap_or(self.current_scale)
    }

    #[inline]
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    #[inline]
    pub fn is_input_locked(&self) -> bool {
        self.input_locked
    }

    /// `base_fixed_step * current_scale`.
    #[inline]
    pub fn fixed_step(&self) -> f32 {
        self.tuning.base_fixed_step * self.current_scale
    }

    /// Start moving the clock towards `target` from wherever it is now.
    /// Replaces any running transition.
    pub fn request_scale(&mut self, target: f32) {
        let duration = self
            .tuning
            .transition_duration(self.current_scale, target);
        if duration <= 0.0 {
            self.current_scale = target;
            self.transition = None;
            return;
        }
        self.transition = Some(Transition {
            from: self.current_scale,
            target,
            duration,
            elapsed: 0.0,
        });
    }

    /// Trigger pressed.  Returns whether slow motion engaged.
    pub fn engage(&mut self, juice: &ResourceLedger<f32>) -> bool {
        self.trigger_held = true;
        if self.engaged || self.input_locked {
            return false;
        }
        if !juice.can_subtract(0.0) {
            return false;
        }
        self.engaged = true;
        self.request_scale(self.tuning.slow_scale);
        true
    }

    /// Trigger released.  Always unlocks input.
    pub fn release(&mut self) {
        self.trigger_held = false;
        self.input_locked = false;
        if self.engaged {
            self.engaged = false;
            self.request_scale(1.0);
        }
    }

    /// Hard cancel: freeze the clock where it is and unwind to `1.0`.
    ///
    /// Activation stays locked until the trigger is released if it is still
    /// held now.
    pub fn cancel(&mut self) {
        self.engaged = false;
        self.input_locked = self.trigger_held;
        self.transition = None;
        self.request_scale(1.0);
    }

    /// Snap back to normal speed for a respawn.
    pub fn reset(&mut self) {
        self.engaged = false;
        self.input_locked = false;
        self.transition = None;
        self.current_scale = 1.0;
    }

    /// Advance by one unscaled tick.  Drains juice while engaged and cancels
    /// when the drain is refused.
    pub fn tick(&mut self, unscaled_dt: f32, juice: &mut ResourceLedger<f32>) -> ClockSample {
        let dt = unscaled_dt.max(0.0);
        let mut exhausted = false;

        if self.engaged && !juice.subtract(self.tuning.drain_per_second * dt) {
            self.cancel();
            exhausted = true;
        }

        if let Some(mut transition) = self.transition {
            transition.elapsed += dt;
            if transition.elapsed >= transition.duration {
                self.current_scale = transition.target;
                self.transition = None;
            } else {
                let t = transition.elapsed / transition.duration;
                self.current_scale = transition.from + (transition.target - transition.from) * t;
                self.transition = Some(transition);
            }
        }

        ClockSample {
            scale: self.current_scale,
            fixed_step: self.fixed_step(),
            exhausted,
        }
    }
}

impl Default for TimeDilation {
    fn default() -> Self {
        Self::new(DilationTuning::from_config(&RocketConfig::default()))
    }
}

// ── ECS surface ───────────────────────────────────────────────────────────────

/// Slow-motion trigger input.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DilationRequest {
    Engage,
    Release,
    Cancel,
}

/// Startup system: rebuild the controller from the loaded config.
pub fn init_dilation_from_config(mut commands: Commands, config: Res<RocketConfig>) {
    commands.insert_resource(TimeDilation::new(DilationTuning::from_config(&config)));
}

/// Apply queued [`DilationRequest`]s.
pub fn dilation_request_system(
    mut requests: MessageReader<DilationRequest>,
    mut dilation: ResMut<TimeDilation>,
    juice: Res<JuiceLedger>,
) {
    for request in requests.read() {
        match request {
            DilationRequest::Engage => {
                if dilation.engage(&juice.0) {
                    debug!("[dilation] engaged");
                }
            }
            DilationRequest::Release => dilation.release(),
            DilationRequest::Cancel => dilation.cancel(),
        }
    }
}

/// Write `scale` and `fixed_step` to Bevy's virtual and fixed clocks.
pub fn write_clocks(
    scale: f32,
    fixed_step: f32,
    virtual_time: &mut Time<Virtual>,
    fixed_time: &mut Time<Fixed>,
) {
    if virtual_time.relative_speed() != scale {
        virtual_time.set_relative_speed(scale);
    }
    fixed_time.set_timestep_seconds(f64::from(fixed_step));
}

/// Advance the dilation on real time and write both clocks.
pub fn dilation_tick_system(
    real_time: Res<Time<Real>>,
    mut dilation: ResMut<TimeDilation>,
    mut juice: ResMut<JuiceLedger>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut fixed_time: ResMut<Time<Fixed>>,
) {
    let sample = dilation.tick(real_time.delta_secs(), &mut juice.0);
    if sample.exhausted {
        info!("[dilation] juice exhausted; returning to normal speed");
    }
    write_clocks(
        sample.scale,
        sample.fixed_step,
        &mut virtual_time,
        &mut fixed_time,
    );
}

/// Snap back to normal speed on `BeforeRespawn`, clocks included, so the
/// next fixed tick already runs at the base step.
pub fn dilation_respawn_reaction_system(
    mut events: MessageReader<RespawnEvent>,
    mut dilation: ResMut<TimeDilation>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut fixed_time: ResMut<Time<Fixed>>,
) {
    let mut reset = false;
    for event in events.read() {
        if event.phase == RespawnPhase::BeforeRespawn {
            dilation.reset();
            reset = true;
        }
    }
    if reset {
        write_clocks(
            dilation.current_scale(),
            dilation.fixed_step(),
            &mut virtual_time,
            &mut fixed_time,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> DilationTuning {
        DilationTuning {
            slow_scale: 0.25,
            transition_time: 0.3,
            drain_per_second: 25.0,
            base_fixed_step: 1.0 / 60.0,
        }
    }

    fn juice(amount: f32) -> ResourceLedger<f32> {
        ResourceLedger::new("juice", amount)
            .with_min(0.0)
            .with_max(100.0)
            .clamp_on_overflow_min(-1.0)
    }

    /// Tick until settled and return the real time it took.
    fn settle(dilation: &mut TimeDilation, juice: &mut ResourceLedger<f32>, dt: f32) -> f32 {
        let mut elapsed = 0.0;
        while dilation.is_transitioning() {
            dilation.tick(dt, juice);
            elapsed += dt;
            assert!(elapsed < 10.0, "transition never settled");
        }
        elapsed
    }

    #[test]
    fn fixed_step_tracks_scale_every_tick() {
        let mut dilation = TimeDilation::new(tuning());
        let mut juice = juice(100.0);
        assert!(dilation.engage(&juice));
        for _ in 0..40 {
            let sample = dilation.tick(1.0 / 120.0, &mut juice);
            assert!((sample.fixed_step - sample.scale / 60.0).abs() < 1e-7);
            assert!((dilation.fixed_step() - dilation.current_scale() / 60.0).abs() < 1e-7);
        }
        assert_eq!(dilation.current_scale(), 0.25);
    }

    #[test]
    fn transition_time_is_linear_in_distance() {
        let t = tuning();
        let full = t.transition_duration(1.0, 0.25);
        let half = t.transition_duration(1.0, 0.625);
        assert!((full - 0.3).abs() < 1e-6);
        assert!((half - full / 2.0).abs() < 1e-6);

        let mut dilation = TimeDilation::new(t);
        let mut juice = juice(100.0);
        dilation.request_scale(0.625);
        let measured = settle(&mut dilation, &mut juice, 0.001);
        assert!((measured - 0.15).abs() < 0.002, "took {measured}s");
    }

    #[test]
    fn release_mid_transition_unwinds_from_current_value() {
        let mut dilation = TimeDilation::new(tuning());
        let mut juice = juice(100.0);
        dilation.engage(&juice);
        for _ in 0..10 {
            dilation.tick(0.01, &mut juice);
        }
        let frozen = dilation.current_scale();
        assert!(frozen < 1.0 && frozen > 0.25);

        dilation.release();
        assert_eq!(dilation.target_scale(), 1.0);
        let back = settle(&mut dilation, &mut juice, 0.001);
        let expected = tuning().transition_duration(frozen, 1.0);
        assert!((back - expected).abs() < 0.002);
        assert_eq!(dilation.current_scale(), 1.0);
    }

    #[test]
    fn drain_failure_ends_dilation() {
        let mut dilation = TimeDilation::new(tuning());
        let mut juice = ResourceLedger::new("juice", 1.0).with_min(0.0);
        assert!(dilation.engage(&juice));
        let mut exhausted = false;
        for _ in 0..60 {
            exhausted |= dilation.tick(1.0 / 60.0, &mut juice).exhausted;
        }
        assert!(exhausted);
        assert!(!dilation.is_engaged());
        assert_eq!(dilation.target_scale(), 1.0);
    }

    #[test]
    fn empty_juice_refuses_to_engage() {
        let mut dilation = TimeDilation::new(tuning());
        let juice = juice(0.0);
        assert!(!dilation.engage(&juice));
        assert_eq!(dilation.target_scale(), 1.0);
    }

    #[test]
    fn cancel_while_held_locks_until_release() {
        let mut dilation = TimeDilation::new(tuning());
        let mut juice = juice(100.0);
        dilation.engage(&juice);
        dilation.tick(0.05, &mut juice);
        dilation.cancel();
        assert!(dilation.is_input_locked());
        assert!(!dilation.engage(&juice), "held trigger must not re-engage");

        dilation.release();
        assert!(!dilation.is_input_locked());
        assert!(dilation.engage(&juice));
    }

    #[test]
    fn cancel_after_release_leaves_input_unlocked() {
        let mut dilation = TimeDilation::new(tuning());
        let juice = juice(100.0);
        dilation.engage(&juice);
        dilation.release();
        dilation.cancel();
        assert!(!dilation.is_input_locked());
    }

    #[test]
    fn reset_snaps_to_normal_speed() {
        let mut dilation = TimeDilation::new(tuning());
        let mut juice = juice(100.0);
        dilation.engage(&juice);
        settle(&mut dilation, &mut juice, 0.01);
        dilation.reset();
        assert_eq!(dilation.current_scale(), 1.0);
        assert!(!dilation.is_transitioning());
        assert!((dilation.fixed_step() - 1.0 / 60.0).abs() < 1e-7);
    }

    #[test]
    fn tick_system_writes_both_clocks() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeDilation::new(tuning()));
        app.insert_resource(JuiceLedger::default());
        app.add_message::<DilationRequest>();
        app.add_systems(Update, (dilation_request_system, dilation_tick_system).chain());

        app.world_mut().write_message(DilationRequest::Engage);
        // Run long enough on the real clock for the full transition.
        for _ in 0..200 {
            app.update();
            std::thread::sleep(std::time::Duration::from_millis(2));
            if !app.world().resource::<TimeDilation>().is_transitioning() {
                break;
            }
        }

        let dilation = app.world().resource::<TimeDilation>();
        let virtual_speed = app.world().resource::<Time<Virtual>>().relative_speed();
        let timestep = app.world().resource::<Time<Fixed>>().timestep().as_secs_f32();
        assert!((virtual_speed - dilation.current_scale()).abs() < 1e-6);
        assert!(
            (timestep - dilation.fixed_step()).abs() < 1e-6,
            "fixed step {timestep} should equal base × scale {}",
            dilation.fixed_step()
        );
        assert!(dilation.current_scale() < 1.0);
    }

    #[test]
    fn respawn_reaction_restores_both_clocks() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeDilation::new(tuning()));
        app.add_message::<RespawnEvent>();
        app.add_systems(Update, dilation_respawn_reaction_system);
        {
            let world = app.world_mut();
            world.resource_mut::<Time<Virtual>>().set_relative_speed(0.25);
            world
                .resource_mut::<Time<Fixed>>()
                .set_timestep_seconds(1.0 / 240.0);
        }

        app.world_mut().write_message(RespawnEvent {
            phase: RespawnPhase::BeforeRespawn,
            respawn_count: 1,
        });
        app.update();

        let virtual_speed = app.world().resource::<Time<Virtual>>().relative_speed();
        let timestep = app.world().resource::<Time<Fixed>>().timestep().as_secs_f32();
        assert_eq!(virtual_speed, 1.0);
        assert!((timestep - 1.0 / 60.0).abs() < 1e-6, "fixed step {timestep}");
    }
}
