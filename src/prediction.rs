//! Trajectory preview through a shadow physics world.
//!
//! [`ShadowWorld`] is a second, fully separate headless Bevy [`App`] running
//! its own Rapier pipeline.  It holds a geometry-only copy of the level (every
//! solid [`LevelGeometry`] collider, as fixed bodies) and one shadow rocket
//! built from the same [`rocket_body_bundle`] as the live rocket.
//!
//! While the live rocket is charging, every fixed tick:
//!
//! 1. The shadow rocket is teleported to the live rocket's transform.
//! 2. A fresh [`FlightController`] primed with the live charge level fires
//!    [`FlightController::launch`] on it.
//! 3. The shadow app is stepped exactly `N` times at the live fixed step,
//!    running the burn and orientation model between steps, and the rocket
//!    position after each step is recorded.
//!
//! Nothing in the shadow world refers to a live entity, so the preview never
//! feeds back into live physics.  The shadow app is not `Send`, so it lives
//! in the live app as a non-send resource.

use crate::config::RocketConfig;
use crate::error::{RocketError, RocketResult};
use crate::flight::{
    FlightController, FlightMode, FlightTuning, OrientationFollow, OrientationMode, RocketBody,
};
use crate::level::{rocket_body_bundle, LevelGeometry, Rocket};
use bevy::prelude::*;
use bevy::transform::TransformPlugin;
use bevy_rapier3d::prelude::*;

// ── Shadow world ──────────────────────────────────────────────────────────────

/// Isolated physics world used only for prediction.
pub struct ShadowWorld {
    app: App,
    rocket: Entity,
    geometry: Vec<Entity>,
    ready: bool,
    tuning: FlightTuning,
    steps: usize,
}

impl ShadowWorld {
    pub fn new(config: &RocketConfig) -> Self {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, TransformPlugin))
            .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
            .insert_resource(TimestepMode::Fixed {
                dt: config.base_fixed_step,
                substeps: 1,
            });
        app.finish();
        app.cleanup();

        let rocket = app
            .world_mut()
            .spawn((
                rocket_body_bundle(config),
                Sleeping::disabled(),
                Transform::from_translation(config.level_start()),
            ))
            .id();
        // Runs Startup, which creates the Rapier context.
        app.update();

        Self {
            app,
            rocket,
            geometry: Vec::new(),
            ready: false,
            tuning: FlightTuning::from_config(config),
            steps: config.prediction_steps,
        }
    }

    /// Whether level geometry has been copied in.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of points every prediction returns.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    #[inline]
    pub fn geometry_count(&self) -> usize {
        self.geometry.len()
    }

    /// Replace the level copy with `colliders`.
    pub fn rebuild_geometry(
        &mut self,
        colliders: impl IntoIterator<Item = (Collider, Transform)>,
    ) -> RocketResult<usize> {
        let world = self.app.world_mut();
        for entity in self.geometry.drain(..) {
            world.despawn(entity);
        }
        for (collider, transform) in colliders {
            let entity = world.spawn((RigidBody::Fixed, collider, transform)).id();
            self.geometry.push(entity);
        }

        if self.geometry.is_empty() {
            self.ready = false;
            return Err(RocketError::EmptyLevelGeometry);
        }
        // Let Rapier register the new colliders before the next prediction.
        self.app.update();
        self.ready = true;
        Ok(self.geometry.len())
    }

    /// Predict the flight of a launch from `start` at `charge_level`,
    /// stepping `step` seconds per physics tick.
    ///
    /// Returns exactly [`Self::steps`] positions, or
    /// [`RocketError::ShadowWorldNotReady`] when the level copy has not been
    /// built yet.
    pub fn predict(
        &mut self,
        start: &Transform,
        charge_level: f32,
        step: f32,
    ) -> RocketResult<Vec<Vec3>> {
        if !self.ready {
            return Err(RocketError::ShadowWorldNotReady);
        }
        self.app.insert_resource(TimestepMode::Fixed {
            dt: step,
            substeps: 1,
        });
        self.teleport(start);

        let mut flight = FlightController::primed(self.tuning, charge_level);
        flight.launch(&mut ShadowBody {
            world: self.app.world_mut(),
            entity: self.rocket,
        });

        let mut points = Vec::with_capacity(self.steps);
        for _ in 0..self.steps {
            flight.tick_burn(
                step,
                &mut ShadowBody {
                    world: self.app.world_mut(),
                    entity: self.rocket,
                },
            );
            self.app.update();

            let world = self.app.world_mut();
            let Some(velocity) = world.get::<Velocity>(self.rocket).map(|v| v.linvel) else {
                break;
            };
            let follow = world.get::<OrientationFollow>(self.rocket).copied();
            let Some(mut transform) = world.get_mut::<Transform>(self.rocket) else {
                break;
            };
            points.push(transform.translation);
            if let Some(follow) = follow {
                transform.rotation = follow.step(transform.rotation, velocity, step);
            }
        }

        // Keep the length invariant even if the shadow rocket vanished.
        let last = points.last().copied().unwrap_or(start.translation);
        points.resize(self.steps, last);
        Ok(points)
    }

    fn teleport(&mut self, start: &Transform) {
        let world = self.app.world_mut();
        if let Some(mut transform) = world.get_mut::<Transform>(self.rocket) {
            transform.translation = start.translation;
            transform.rotation = start.rotation;
        }
        if let Some(mut velocity) = world.get_mut::<Velocity>(self.rocket) {
            *velocity = Velocity::zero();
        }
        if let Some(mut impulse) = world.get_mut::<ExternalImpulse>(self.rocket) {
            *impulse = ExternalImpulse::default();
        }
        if let Some(mut force) = world.get_mut::<ExternalForce>(self.rocket) {
            *force = ExternalForce::default();
        }
        if let Some(mut follow) = world.get_mut::<OrientationFollow>(self.rocket) {
            follow.set_mode(OrientationMode::Velocity, start.rotation);
        }
    }
}

/// [`RocketBody`] over the shadow rocket entity.
struct ShadowBody<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl ShadowBody<'_> {
    fn rotation(&self) -> Quat {
        self.world
            .get::<Transform>(self.entity)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY)
    }
}

impl RocketBody for ShadowBody<'_> {
    fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }

    fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        if let Some(mut velocity) = self.world.get_mut::<Velocity>(self.entity) {
            velocity.linvel = linear;
            velocity.angvel = angular;
        }
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        if let Some(mut external) = self.world.get_mut::<ExternalImpulse>(self.entity) {
            external.impulse += impulse;
        }
    }

    fn apply_force(&mut self, force: Vec3) {
        if let Some(mut external) = self.world.get_mut::<ExternalForce>(self.entity) {
            external.force = force;
            external.torque = Vec3::ZERO;
        }
    }

    fn set_orientation_mode(&mut self, mode: OrientationMode) {
        let rotation = self.rotation();
        if let Some(mut follow) = self.world.get_mut::<OrientationFollow>(self.entity) {
            follow.set_mode(mode, rotation);
        }
    }
}

// ── Preview resource ──────────────────────────────────────────────────────────

/// Inputs a preview was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PredictionKey {
    position: Vec3,
    rotation: Quat,
    charge_level: f32,
    step: f32,
}

/// The current trajectory polyline.  Empty when there is nothing to preview.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct TrajectoryPreview {
    pub points: Vec<Vec3>,
    key: Option<PredictionKey>,
}

impl TrajectoryPreview {
    pub fn clear(&mut self) {
        self.points.clear();
        self.key = None;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keep the polyline but force the next charging tick to recompute it.
    pub fn invalidate(&mut self) {
        self.key = None;
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Startup system: build the shadow world once the config is loaded.
pub fn init_shadow_world(world: &mut World) {
    let config = world.resource::<RocketConfig>().clone();
    world.insert_non_send_resource(ShadowWorld::new(&config));
    println!("✓ Shadow physics world created");
}

/// Rebuild the shadow level copy whenever solid geometry is added or removed.
pub fn shadow_geometry_sync_system(
    shadow: Option<NonSendMut<ShadowWorld>>,
    added: Query<(), Added<LevelGeometry>>,
    mut removed: RemovedComponents<LevelGeometry>,
    geometry: Query<(&Collider, &Transform), (With<LevelGeometry>, Without<Sensor>)>,
    mut preview: ResMut<TrajectoryPreview>,
) {
    let removed_any = removed.read().count() > 0;
    if added.is_empty() && !removed_any {
        return;
    }
    let Some(mut shadow) = shadow else {
        return;
    };
    match shadow.rebuild_geometry(geometry.iter().map(|(c, t)| (c.clone(), *t))) {
        Ok(count) => {
            preview.invalidate();
            info!("[prediction] shadow level rebuilt with {count} colliders");
        }
        Err(e) => warn!("[prediction] {e}"),
    }
}

/// Recompute the preview while the live rocket charges; clear it otherwise.
pub fn trajectory_prediction_system(
    shadow: Option<NonSendMut<ShadowWorld>>,
    fixed_time: Res<Time<Fixed>>,
    rockets: Query<(&FlightController, &Transform), With<Rocket>>,
    mut preview: ResMut<TrajectoryPreview>,
) {
    let charging = rockets
        .single()
        .ok()
        .filter(|(flight, _)| flight.mode() == FlightMode::Charging);
    let Some((flight, transform)) = charging else {
        if !preview.is_empty() {
            preview.clear();
        }
        return;
    };
    let Some(mut shadow) = shadow else {
        return;
    };

    let key = PredictionKey {
        position: transform.translation,
        rotation: transform.rotation,
        charge_level: flight.charge_level(),
        step: fixed_time.timestep().as_secs_f32(),
    };
    if preview.key == Some(key) {
        return;
    }
    match shadow.predict(transform, key.charge_level, key.step) {
        Ok(points) => {
            preview.points = points;
            preview.key = Some(key);
        }
        Err(RocketError::ShadowWorldNotReady) => {}
        Err(e) => debug!("[prediction] skipped: {e}"),
    }
}
