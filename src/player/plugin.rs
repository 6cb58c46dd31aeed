//! Player plugin - movement, crouch, jump, and replication systems.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::animation::clear_jump_cues;
use super::components::*;
use super::movement::*;
use super::replication::*;
use crate::core::GameState;
use crate::net::BroadcastSet;

/// Player plugin - handles the locally owned player and applies peers' broadcasts.
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(MovementConfig::load())
            // Owner systems, in tick order
            .add_systems(
                Update,
                (
                    update_sprint,
                    broadcast_body_yaw,
                    broadcast_animation,
                    update_crouch,
                    jump,
                    smooth_head_height,
                    broadcast_position,
                )
                    .chain()
                    .in_set(BroadcastSet::Send)
                    .run_if(in_state(GameState::InGame)),
            )
            // Every peer applies replayed broadcasts
            .add_systems(
                Update,
                (apply_body_orientation, apply_animation_state, apply_remote_position)
                    .in_set(BroadcastSet::Receive),
            )
            .add_systems(
                Update,
                draw_crouch_trace.run_if(|config: Res<MovementConfig>| config.enable_debug),
            )
            .add_systems(
                FixedUpdate,
                (build_wish_velocity, integrate_movement)
                    .chain()
                    .run_if(in_state(GameState::InGame)),
            )
            .add_systems(
                FixedPostUpdate,
                finish_movement
                    .after(PhysicsSet::Writeback)
                    .run_if(in_state(GameState::InGame)),
            )
            .add_systems(Last, clear_jump_cues);
    }
}
