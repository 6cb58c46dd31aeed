//! Session state: who is connected and which peer we are.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// A connected peer and its opaque user data.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: PeerId,
    pub display_name: String,
    user_data: HashMap<String, String>,
}

impl Connection {
    pub fn new(id: PeerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            user_data: HashMap::new(),
        }
    }

    pub fn with_user_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_data.insert(key.into(), value.into());
        self
    }

    /// Raw user data published by the peer, e.g. its avatar.
    pub fn user_data(&self, key: &str) -> Option<&str> {
        self.user_data.get(key).map(String::as_str)
    }
}

/// The current network session.
#[derive(Resource, Debug)]
pub struct NetworkSession {
    local_peer: PeerId,
    active: bool,
    is_host: bool,
    connections: HashMap<PeerId, Connection>,
}

impl Default for NetworkSession {
    fn default() -> Self {
        Self {
            local_peer: PeerId(1),
            active: false,
            is_host: false,
            connections: HashMap::new(),
        }
    }
}

impl NetworkSession {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    /// Start hosting. The local peer becomes the first connection.
    ///
    /// Returns the local connection so the caller can announce it.
    pub fn create_lobby(&mut self, display_name: &str, avatar: Option<String>) -> Connection {
        self.active = true;
        self.is_host = true;

        let mut local = Connection::new(self.local_peer, display_name);
        if let Some(avatar) = avatar {
            local = local.with_user_data(AVATAR_KEY, avatar);
        }
        self.connections.insert(local.id, local.clone());
        local
    }

    /// Record a connection announced by the transport.
    pub fn register(&mut self, connection: Connection) {
        self.connections.insert(connection.id, connection);
    }

    pub fn connection(&self, peer: PeerId) -> Option<&Connection> {
        self.connections.get(&peer)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// User-data key holding a peer's serialized clothing.
pub const AVATAR_KEY: &str = "avatar";

/// The peer that owns (and simulates) an entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkOwner(pub PeerId);

impl NetworkOwner {
    /// True when another peer owns this entity; its state only arrives by broadcast.
    pub fn is_proxy(&self, session: &NetworkSession) -> bool {
        self.0 != session.local_peer()
    }
}

/// A peer connected. Sent by the transport, or by lobby creation for the host.
#[derive(Event, Debug, Clone)]
pub struct PeerConnected(pub Connection);

/// A peer finished loading and can be given a player.
#[derive(Event, Debug, Clone, Copy)]
pub struct PeerActive(pub PeerId);

/// A player entity was spawned on behalf of a peer.
#[derive(Event, Debug, Clone, Copy)]
pub struct NetworkSpawned {
    pub entity: Entity,
    pub owner: PeerId,
}
