//! Player-related components and movement tuning.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::Deserialize;

use crate::core::load_or_default;

/// Marker component for the player root entity.
#[derive(Component)]
pub struct Player;

/// Marker for the head (eye point). Its local rotation is the look rotation.
#[derive(Component)]
pub struct Head;

/// Marker for the visible body, which turns to follow the head's yaw.
#[derive(Component)]
pub struct Body;

/// The parts of a player rig, stored on the root.
#[derive(Component, Debug, Clone, Copy)]
pub struct PlayerParts {
    pub head: Entity,
    pub body: Entity,
    pub camera: Entity,
}

/// Per-tick movement intent.
#[derive(Component, Debug, Default)]
pub struct PlayerMotor {
    /// Desired horizontal velocity built from input
    pub wish_velocity: Vec3,
    pub sprinting: bool,
    /// A move was handed to the controller this fixed step and awaits its result
    pub move_requested: bool,
}

/// Kinematic character state. The root's origin sits at the feet.
#[derive(Component, Debug, Clone)]
pub struct CharacterBody {
    pub velocity: Vec3,
    /// Current capsule height
    pub height: f32,
    /// Height when not crouched
    pub standing_height: f32,
    pub radius: f32,
    pub on_ground: bool,
    /// Ground acceleration factor
    pub acceleration: f32,
    /// Speeds below this get friction as if moving at this speed
    pub stop_speed: f32,
}

impl CharacterBody {
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            velocity: Vec3::ZERO,
            height: config.standing_height,
            standing_height: config.standing_height,
            radius: config.radius,
            on_ground: false,
            acceleration: config.acceleration,
            stop_speed: config.stop_speed,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Accelerate toward `wish` without ever exceeding its speed along its direction.
    pub fn accelerate(&mut self, wish: Vec3, dt: f32) {
        let wish_speed = wish.length();
        if wish_speed <= f32::EPSILON {
            return;
        }
        let wish_dir = wish / wish_speed;

        let current_speed = self.velocity.dot(wish_dir);
        let add_speed = wish_speed - current_speed;
        if add_speed <= 0.0 {
            return;
        }

        let accel_speed = (self.acceleration * dt * wish_speed).min(add_speed);
        self.velocity += wish_dir * accel_speed;
    }

    /// Scale velocity down by `amount` of friction over `dt`.
    pub fn apply_friction(&mut self, amount: f32, dt: f32) {
        let speed = self.velocity.length();
        if speed < 0.01 {
            return;
        }

        let control = speed.max(self.stop_speed);
        let new_speed = (speed - control * dt * amount).max(0.0);
        self.velocity *= new_speed / speed;
    }

    /// Instant velocity change that also leaves the ground.
    pub fn punch(&mut self, impulse: Vec3) {
        self.velocity += impulse;
        if impulse.y > 0.0 {
            self.on_ground = false;
        }
    }

    /// Capsule collider spanning the current height from the feet up.
    pub fn collider(&self) -> Collider {
        let bottom = Vec3::Y * self.radius;
        let top = Vec3::Y * (self.height - self.radius).max(self.radius);
        Collider::capsule(bottom, top, self.radius)
    }
}

/// Movement tuning loaded from assets/data/movement.ron.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Friction while grounded
    pub ground_control: f32,
    /// Friction while airborne
    pub air_control: f32,
    /// Max wish speed applied while airborne
    pub max_force: f32,
    /// Walk speed in units per second
    pub speed: f32,
    pub run_speed: f32,
    pub crouch_speed: f32,
    /// Upward velocity added by a jump
    pub jump_force: f32,
    /// How fast the body turns toward the head yaw
    pub rotate_velocity: f32,
    /// Body turns only when off by more than this many degrees...
    pub rotate_threshold_degrees: f32,
    /// ...or when moving faster than this
    pub rotate_speed_threshold: f32,
    /// Length of the stand-up headroom trace
    pub trace_crouch_distance: f32,
    /// Radius of the stand-up headroom trace
    pub stand_up_probe_radius: f32,
    /// Head height easing speed when crouching/standing
    pub crouch_speed_cam: f32,
    pub acceleration: f32,
    pub stop_speed: f32,
    pub standing_height: f32,
    pub radius: f32,
    /// Head height above the feet while standing
    pub head_height: f32,
    /// Used when no physics context reports gravity
    pub gravity: Vec3,
    /// Draw the stand-up trace
    pub enable_debug: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            ground_control: 4.0,
            air_control: 0.1,
            max_force: 1.25,
            speed: 4.0,
            run_speed: 7.4,
            crouch_speed: 2.3,
            jump_force: 5.0,
            rotate_velocity: 5.0,
            rotate_threshold_degrees: 1.0,
            rotate_speed_threshold: 0.25,
            trace_crouch_distance: 0.75,
            stand_up_probe_radius: 0.2,
            crouch_speed_cam: 5.0,
            acceleration: 10.0,
            stop_speed: 3.5,
            standing_height: 1.8,
            radius: 0.3,
            head_height: 1.6,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            enable_debug: false,
        }
    }
}

impl MovementConfig {
    pub fn load() -> Self {
        load_or_default("movement.ron")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> CharacterBody {
        CharacterBody::new(&MovementConfig::default())
    }

    #[test]
    fn accelerate_caps_at_wish_speed() {
        let mut body = body();
        let wish = Vec3::X * 4.0;
        for _ in 0..200 {
            body.accelerate(wish, 1.0 / 60.0);
        }
        assert!((body.velocity.x - 4.0).abs() < 1e-4);
        assert_eq!(body.velocity.z, 0.0);
    }

    #[test]
    fn accelerate_step_is_bounded_by_acceleration() {
        let mut body = body();
        body.accelerate(Vec3::X * 4.0, 0.01);
        // acceleration * dt * wish_speed = 10 * 0.01 * 4
        assert!((body.velocity.x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn accelerate_does_nothing_when_already_faster() {
        let mut body = body();
        body.velocity = Vec3::X * 10.0;
        body.accelerate(Vec3::X * 4.0, 0.1);
        assert_eq!(body.velocity, Vec3::X * 10.0);
    }

    #[test]
    fn friction_uses_stop_speed_below_it() {
        let mut body = body();
        body.velocity = Vec3::X * 1.0;
        // control = stop_speed 3.5, drop = 3.5 * 0.1 * 1.0 = 0.35
        body.apply_friction(1.0, 0.1);
        assert!((body.velocity.x - 0.65).abs() < 1e-6);
    }

    #[test]
    fn friction_never_reverses_direction() {
        let mut body = body();
        body.velocity = Vec3::new(0.5, 0.0, 0.5);
        body.apply_friction(4.0, 1.0);
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn upward_punch_leaves_ground() {
        let mut body = body();
        body.on_ground = true;
        body.punch(Vec3::Y * 5.0);
        assert!(!body.on_ground);
        assert_eq!(body.velocity.y, 5.0);
    }
}
