//! FPS Netplay - Entry Point
//!
//! Controls:
//! - WASD / Arrows: Move
//! - Mouse: Look around
//! - Shift: Sprint
//! - Ctrl / C: Crouch
//! - Space: Jump
//! - Escape: Pause/Unpause

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

fn main() {
    App::new()
        // Bevy default plugins
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "FPS Netplay".to_string(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))

        // Physics runs in the fixed schedule alongside character integration
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())

        // Our game plugin
        .add_plugins(fps_netplay::NetplayPlugin)

        .run();
}
