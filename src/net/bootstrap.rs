//! Session bootstrap: host a lobby on load and spawn a player per active peer.
//!
//! Only the host decides where players spawn. It broadcasts a
//! `PlayerSpawned` for each one, and every other peer spawns the same player
//! on receipt: locally owned if it is theirs, a proxy otherwise.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

use super::broadcast::{Broadcaster, ReceivedBroadcast};
use super::messages::NetMessage;
use super::session::{NetworkSession, NetworkSpawned, PeerActive, PeerConnected, PeerId};
use crate::camera::{CameraConfig, LookAngles};
use crate::core::{load_or_default, GameState};
use crate::player::{spawn_player, yaw_degrees, MovementConfig, PlayerParts};

/// A spawn point listed in the network config.
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnPointDef {
    pub position: (f32, f32, f32),
    #[serde(default)]
    pub yaw_degrees: f32,
}

impl SpawnPointDef {
    pub fn transform(&self) -> Transform {
        Transform::from_xyz(self.position.0, self.position.1, self.position.2)
            .with_rotation(Quat::from_rotation_y(self.yaw_degrees.to_radians()))
    }
}

/// Network bootstrap configuration loaded from assets/data/network.ron.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host a lobby on load if no session is active
    pub start_server: bool,
    /// Display name of the local peer
    pub display_name: String,
    /// File holding the local avatar blob, shared as user data
    pub avatar_file: Option<String>,
    /// Spawn a player for each peer that becomes active
    pub spawn_players: bool,
    /// Preferred spawn points; scene `SpawnPoint`s are used when empty
    pub spawn_points: Vec<SpawnPointDef>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            start_server: true,
            display_name: "Player".to_string(),
            avatar_file: Some("assets/data/avatar.ron".to_string()),
            spawn_players: true,
            spawn_points: Vec::new(),
        }
    }
}

impl NetworkConfig {
    pub fn load() -> Self {
        load_or_default("network.ron")
    }

    /// Read the avatar blob, if one is configured and readable.
    fn read_avatar(&self) -> Option<String> {
        let path = self.avatar_file.as_ref()?;
        match fs::read_to_string(path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                warn!("Could not read avatar {}: {}", path, e);
                None
            }
        }
    }
}

/// Marker for spawn points placed in the scene. Spawn points are top-level entities.
#[derive(Component, Debug, Default)]
pub struct SpawnPoint;

/// Pick where a new player appears.
///
/// Uniform over `configured` if it has any entries, else uniform over
/// `tagged` scene spawn points, else the world origin. Scale is always 1.
pub fn choose_spawn_location<R: Rng + ?Sized>(
    configured: &[Transform],
    tagged: &[Transform],
    rng: &mut R,
) -> Transform {
    let chosen = configured
        .choose(rng)
        .or_else(|| tagged.choose(rng))
        .copied()
        .unwrap_or(Transform::IDENTITY);

    chosen.with_scale(Vec3::ONE)
}

/// Host a lobby if configured to, then enter the game.
pub fn create_lobby_on_load(
    config: Res<NetworkConfig>,
    mut session: ResMut<NetworkSession>,
    mut connected: EventWriter<PeerConnected>,
    mut active: EventWriter<PeerActive>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if config.start_server && !session.is_active() {
        info!("Creating lobby");
        let local = session.create_lobby(&config.display_name, config.read_avatar());
        let peer = local.id;
        connected.send(PeerConnected(local));
        active.send(PeerActive(peer));
    }

    next_state.set(GameState::InGame);
}

/// Record newly connected peers in the session.
pub fn on_peer_connected(
    mut events: EventReader<PeerConnected>,
    mut session: ResMut<NetworkSession>,
) {
    for PeerConnected(connection) in events.read() {
        info!("{} connected as {}", connection.display_name, connection.id);
        session.register(connection.clone());
    }
}

/// Players spawned on this peer, by owner. At most one per peer.
#[derive(Resource, Debug, Default)]
pub struct SpawnedPlayers(HashMap<PeerId, Entity>);

impl SpawnedPlayers {
    pub fn get(&self, peer: PeerId) -> Option<Entity> {
        self.0.get(&peer).copied()
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.0.contains_key(&peer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PeerId, Entity)> + '_ {
        self.0.iter().map(|(peer, entity)| (*peer, *entity))
    }
}

/// System param for spawning networked players.
///
/// Records the player in [`SpawnedPlayers`] right away and announces it with
/// [`NetworkSpawned`].
#[derive(SystemParam)]
pub struct PlayerSpawner<'w, 's> {
    commands: Commands<'w, 's>,
    meshes: ResMut<'w, Assets<Mesh>>,
    materials: ResMut<'w, Assets<StandardMaterial>>,
    movement: Res<'w, MovementConfig>,
    camera: Res<'w, CameraConfig>,
    registry: ResMut<'w, SpawnedPlayers>,
    spawned: EventWriter<'w, NetworkSpawned>,
}

impl PlayerSpawner<'_, '_> {
    pub fn has_player(&self, owner: PeerId) -> bool {
        self.registry.contains(owner)
    }

    pub fn spawn(&mut self, owner: PeerId, name: &str, location: Transform) -> Entity {
        let entity = spawn_player(
            &mut self.commands,
            &mut self.meshes,
            &mut self.materials,
            &self.movement,
            &self.camera,
            owner,
            name,
            location,
        );
        self.registry.0.insert(owner, entity);
        self.spawned.send(NetworkSpawned { entity, owner });
        entity
    }
}

/// Host only: spawn a networked player for every peer that became active and announce it.
pub fn spawn_active_peers(
    mut events: EventReader<PeerActive>,
    mut spawner: PlayerSpawner,
    mut broadcaster: Broadcaster,
    session: Res<NetworkSession>,
    config: Res<NetworkConfig>,
    scene_points: Query<&Transform, With<SpawnPoint>>,
) {
    for PeerActive(peer) in events.read() {
        let display_name = session
            .connection(*peer)
            .map_or_else(|| peer.to_string(), |c| c.display_name.clone());
        info!("Player '{}' has joined the game", display_name);

        if !config.spawn_players || !session.is_host() || spawner.has_player(*peer) {
            continue;
        }

        let configured: Vec<Transform> = config.spawn_points.iter().map(SpawnPointDef::transform).collect();
        let tagged: Vec<Transform> = scene_points.iter().copied().collect();
        let location = choose_spawn_location(&configured, &tagged, &mut rand::thread_rng());

        let name = format!("Player - {}", display_name);
        spawner.spawn(*peer, &name, location);
        broadcaster.send(NetMessage::PlayerSpawned {
            peer: *peer,
            name,
            translation: location.translation,
            yaw: yaw_degrees(location.rotation),
        });
    }
}

/// Spawn players the host announced that this peer does not have yet.
///
/// A peer's own announced player comes out locally owned; everyone else's is a proxy.
pub fn spawn_announced_players(
    mut events: EventReader<ReceivedBroadcast>,
    mut spawner: PlayerSpawner,
) {
    for ReceivedBroadcast(message) in events.read() {
        let NetMessage::PlayerSpawned { peer, name, translation, yaw } = message else {
            continue;
        };
        if spawner.has_player(*peer) {
            continue;
        }

        let location = Transform::from_translation(*translation)
            .with_rotation(Quat::from_rotation_y(yaw.to_radians()));
        spawner.spawn(*peer, name, location);
    }
}

/// Host only: re-announce every existing player when a remote peer connects.
pub fn announce_players_to_new_peers(
    session: Res<NetworkSession>,
    mut events: EventReader<PeerConnected>,
    mut broadcaster: Broadcaster,
    registry: Res<SpawnedPlayers>,
    players: Query<(&Name, &Transform, &PlayerParts)>,
    heads: Query<&LookAngles>,
) {
    let local_peer = session.local_peer();
    let newcomers = events.read().filter(|PeerConnected(c)| c.id != local_peer).count();
    if newcomers == 0 || !session.is_host() {
        return;
    }

    for (peer, entity) in registry.iter() {
        let Ok((name, transform, parts)) = players.get(entity) else {
            continue;
        };
        let yaw = heads.get(parts.head).map_or(0.0, |angles| angles.yaw);
        broadcaster.send(NetMessage::PlayerSpawned {
            peer,
            name: name.as_str().to_string(),
            translation: transform.translation,
            yaw,
        });
    }
}
