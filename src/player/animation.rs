//! Animation parameters published for an external animation graph.

use bevy::prelude::*;

/// Locomotion style hint for the animation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveStyle {
    Auto,
    Walk,
    #[default]
    Run,
}

/// Everything the animation graph needs to pose a player.
///
/// Written on every peer from replayed `AnimationState` and `JumpCue`
/// broadcasts, never directly by the owner.
#[derive(Component, Debug, Clone, Default)]
pub struct AnimationParams {
    pub wish_velocity: Vec3,
    pub velocity: Vec3,
    pub aim: Quat,
    pub grounded: bool,
    pub look_direction: Vec3,
    pub eyes_weight: f32,
    pub head_weight: f32,
    pub body_weight: f32,
    pub move_style: MoveStyle,
    /// 0.0 standing, 1.0 fully crouched
    pub duck_level: f32,
    /// Set for the frame a jump starts
    pub jump_triggered: bool,
}

impl AnimationParams {
    pub fn apply_state(&mut self, wish_velocity: Vec3, velocity: Vec3, aim: Quat, grounded: bool, duck_level: f32) {
        self.wish_velocity = wish_velocity;
        self.velocity = velocity;
        self.aim = aim;
        self.grounded = grounded;
        self.look_direction = aim * Vec3::NEG_Z;
        self.eyes_weight = 1.0;
        self.head_weight = 0.75;
        self.body_weight = 0.5;
        self.move_style = MoveStyle::Run;
        self.duck_level = duck_level;
    }

    pub fn trigger_jump(&mut self) {
        self.jump_triggered = true;
    }
}

/// Jump cues last one frame.
pub fn clear_jump_cues(mut params: Query<&mut AnimationParams>) {
    for mut params in params.iter_mut() {
        if params.jump_triggered {
            params.jump_triggered = false;
        }
    }
}
