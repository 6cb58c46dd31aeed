//! Camera plugin - mouse look, head replication, and camera placement.

use bevy::prelude::*;

use super::rig::*;
use crate::core::GameState;
use crate::net::BroadcastSet;
use crate::player::broadcast_body_yaw;

/// Camera plugin - runs the camera rig for the local player.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(CameraConfig::load())
            .add_systems(
                Update,
                look_systems().run_if(in_state(GameState::InGame)),
            )
            .add_systems(
                Update,
                (apply_head_orientation, place_camera)
                    .chain()
                    .in_set(BroadcastSet::Receive),
            )
            .add_systems(
                Update,
                (activate_owner_camera, update_body_render_mode).after(BroadcastSet::Receive),
            );
    }
}

/// Head rotation lands before the body-yaw check reads it in the same frame.
fn look_systems() -> impl IntoSystemConfigs<()> {
    mouse_look.in_set(BroadcastSet::Send).before(broadcast_body_yaw)
}
