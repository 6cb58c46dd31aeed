//! Appearance plugin - applies clothing when players are network spawned.

use bevy::prelude::*;

use super::clothing::dress_on_network_spawn;
use crate::net::{spawn_active_peers, BroadcastSet};

/// Appearance plugin - dresses players in their owner's avatar.
pub struct AppearancePlugin;

impl Plugin for AppearancePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, dress_on_network_spawn
                .after(spawn_active_peers)
                .before(BroadcastSet::Send));
    }
}
