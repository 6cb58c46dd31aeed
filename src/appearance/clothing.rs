//! Clothing containers and applying them to a player body.
//!
//! The avatar blob is RON:
//!
//! ```ron
//! (items: [
//!     (slot: "hat", model: "models/clothing/cap.glb#Scene0"),
//!     (slot: "torso", model: "models/clothing/hoodie.glb#Scene0"),
//! ])
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::AppearanceError;
use crate::net::{NetworkSession, NetworkSpawned, PeerId, AVATAR_KEY};
use crate::player::PlayerParts;

/// One piece of clothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothingItem {
    /// Body slot the item occupies; a later item replaces an earlier one in the same slot
    pub slot: String,
    /// Scene asset path of the model
    pub model: String,
    /// Offset from the body origin
    #[serde(default)]
    pub offset: (f32, f32, f32),
}

/// A full outfit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClothingContainer {
    pub items: Vec<ClothingItem>,
}

impl ClothingContainer {
    pub fn from_blob(blob: &str) -> Result<Self, AppearanceError> {
        ron::from_str(blob).map_err(|e| AppearanceError::Parse { details: e.to_string() })
    }

    /// Load the avatar a peer published in its user data.
    pub fn for_peer(session: &NetworkSession, peer: PeerId) -> Result<Self, AppearanceError> {
        let connection = session.connection(peer).ok_or(AppearanceError::UnknownPeer(peer))?;
        let blob = connection
            .user_data(AVATAR_KEY)
            .ok_or(AppearanceError::MissingUserData(peer))?;
        Self::from_blob(blob)
    }

    /// Items that end up worn, one per slot, in first-seen slot order.
    pub fn resolved_items(&self) -> Vec<&ClothingItem> {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut worn: Vec<&ClothingItem> = Vec::new();

        for item in &self.items {
            match slots.get(item.slot.as_str()) {
                Some(&index) => worn[index] = item,
                None => {
                    slots.insert(item.slot.as_str(), worn.len());
                    worn.push(item);
                }
            }
        }
        worn
    }

    /// Dress `body`, removing anything applied earlier.
    pub fn apply(
        &self,
        commands: &mut Commands,
        asset_server: &AssetServer,
        body: Entity,
        previous: &[Entity],
    ) {
        for piece in previous {
            commands.entity(*piece).despawn_recursive();
        }

        let mut pieces = Vec::new();
        for item in self.resolved_items() {
            let (x, y, z) = item.offset;
            let piece = commands
                .spawn((
                    ClothingPiece { slot: item.slot.clone() },
                    SceneRoot(asset_server.load(item.model.clone())),
                    Transform::from_xyz(x, y, z),
                    Name::new(format!("Clothing - {}", item.slot)),
                ))
                .id();
            pieces.push(piece);
        }

        commands.entity(body).add_children(&pieces);
        commands.entity(body).insert(Dressed { pieces });
    }
}

/// A clothing model attached to a body.
#[derive(Component, Debug)]
pub struct ClothingPiece {
    pub slot: String,
}

/// The clothing currently on a body.
#[derive(Component, Debug, Default)]
pub struct Dressed {
    pub pieces: Vec<Entity>,
}

/// Dress each newly spawned player in its owner's avatar.
pub fn dress_on_network_spawn(
    mut commands: Commands,
    mut events: EventReader<NetworkSpawned>,
    session: Res<NetworkSession>,
    asset_server: Option<Res<AssetServer>>,
    players: Query<&PlayerParts>,
    dressed: Query<&Dressed>,
) {
    let Some(asset_server) = asset_server else {
        return;
    };

    for NetworkSpawned { entity, owner } in events.read() {
        let Ok(parts) = players.get(*entity) else {
            continue;
        };

        let clothing = match ClothingContainer::for_peer(&session, *owner) {
            Ok(clothing) => clothing,
            Err(e) => {
                warn!("Not dressing player of {}: {}", owner, e);
                continue;
            }
        };

        let previous = dressed.get(parts.body).map(|d| d.pieces.as_slice()).unwrap_or(&[]);
        clothing.apply(&mut commands, &asset_server, parts.body, previous);
        info!("Dressed player of {} in {} item(s)", owner, clothing.resolved_items().len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Connection;

    const OUTFIT: &str = r#"(items: [
        (slot: "hat", model: "models/clothing/cap.glb#Scene0"),
        (slot: "torso", model: "models/clothing/hoodie.glb#Scene0", offset: (0.0, 1.1, 0.0)),
        (slot: "hat", model: "models/clothing/beanie.glb#Scene0"),
    ])"#;

    #[test]
    fn deserializes_outfit_blob() {
        let clothing = ClothingContainer::from_blob(OUTFIT).unwrap();
        assert_eq!(clothing.items.len(), 3);
        assert_eq!(clothing.items[1].offset, (0.0, 1.1, 0.0));
        assert_eq!(clothing.items[0].offset, (0.0, 0.0, 0.0));
    }

    #[test]
    fn later_items_replace_earlier_ones_in_the_same_slot() {
        let clothing = ClothingContainer::from_blob(OUTFIT).unwrap();
        let worn: Vec<&str> = clothing.resolved_items().iter().map(|i| i.model.as_str()).collect();
        assert_eq!(
            worn,
            vec!["models/clothing/beanie.glb#Scene0", "models/clothing/hoodie.glb#Scene0"]
        );
    }

    #[test]
    fn malformed_blob_is_a_parse_error() {
        let err = ClothingContainer::from_blob("not an outfit").unwrap_err();
        assert!(matches!(err, AppearanceError::Parse { .. }));
    }

    #[test]
    fn avatar_comes_from_owner_user_data() {
        let mut session = NetworkSession::default();
        session.register(Connection::new(PeerId(3), "guest").with_user_data(AVATAR_KEY, OUTFIT));
        session.register(Connection::new(PeerId(4), "plain"));

        assert_eq!(ClothingContainer::for_peer(&session, PeerId(3)).unwrap().items.len(), 3);
        assert!(matches!(
            ClothingContainer::for_peer(&session, PeerId(4)),
            Err(AppearanceError::MissingUserData(PeerId(4)))
        ));
        assert!(matches!(
            ClothingContainer::for_peer(&session, PeerId(5)),
            Err(AppearanceError::UnknownPeer(PeerId(5)))
        ));
    }
}
