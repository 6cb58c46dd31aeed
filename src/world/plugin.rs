//! World plugin - builds the arena at startup.

use bevy::prelude::*;

use super::arena::setup_arena;

/// World plugin - handles arena geometry, lighting, and spawn points.
pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_arena);
    }
}
