//! Net plugin - session resources, broadcast flushing, and player spawning.

use bevy::prelude::*;

use super::bootstrap::*;
use super::broadcast::*;
use super::session::*;
use crate::core::GameState;

/// Net plugin - owns the session and the broadcast pipeline.
pub struct NetPlugin;

impl Plugin for NetPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(NetworkConfig::load())
            .init_resource::<NetworkSession>()
            .init_resource::<SpawnedPlayers>()
            .init_resource::<PendingBroadcasts>()
            .init_resource::<Outbox>()
            .init_resource::<Inbox>()
            .add_event::<PeerConnected>()
            .add_event::<PeerActive>()
            .add_event::<NetworkSpawned>()
            .add_event::<ReceivedBroadcast>()
            .configure_sets(
                Update,
                (BroadcastSet::Send, BroadcastSet::Flush, BroadcastSet::Receive)
                    .chain(),
            )
            .add_systems(
                Update,
                create_lobby_on_load.run_if(in_state(GameState::Loading)),
            )
            .add_systems(
                Update,
                (on_peer_connected, announce_players_to_new_peers, spawn_active_peers)
                    .chain()
                    .after(create_lobby_on_load)
                    .before(BroadcastSet::Send),
            )
            .add_systems(Update, flush_broadcasts.in_set(BroadcastSet::Flush))
            .add_systems(Update, spawn_announced_players.in_set(BroadcastSet::Receive));
    }
}
