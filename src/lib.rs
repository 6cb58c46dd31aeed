//! FPS Netplay - a networked first-person/third-person character controller in Bevy.
//!
//! Each connected peer owns one player. The owner simulates its player and
//! broadcasts orientation, animation, and position. Every other peer drives
//! a proxy of that player from the received messages.
//!
//! # Architecture
//!
//! The game is organized into plugins, each handling a specific aspect:
//!
//! - **Core**: Game states, config loading, smoothing
//! - **Input**: Key bindings and per-frame action state
//! - **Net**: Session, broadcast pipeline, lobby bootstrap and spawn selection
//! - **Player**: Movement controller, crouch, animation parameters, replication
//! - **Camera**: Mouse look, head replication, first/third person placement
//! - **Appearance**: Clothing from the owner's avatar data
//! - **World**: Arena geometry, lights, spawn points

pub mod appearance;
pub mod camera;
pub mod core;
pub mod input;
pub mod net;
pub mod physics;
pub mod player;
pub mod world;

use bevy::prelude::*;

/// Main game plugin that adds all sub-plugins.
pub struct NetplayPlugin;

impl Plugin for NetplayPlugin {
    fn build(&self, app: &mut App) {
        app
            // Core systems (must be first)
            .add_plugins(core::CorePlugin)
            .add_plugins(input::InputPlugin)

            // Session and broadcast pipeline
            .add_plugins(net::NetPlugin)

            // Player and camera systems
            .add_plugins(player::PlayerPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(appearance::AppearancePlugin)

            // World systems
            .add_plugins(world::WorldPlugin);
    }
}
