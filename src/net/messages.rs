//! Broadcast message types.
//!
//! Each variant replaces one replicated call of the player rig. Delivery is
//! at most once per tick per `(peer, kind)`, unordered across kinds and
//! without acknowledgement, so every field is absolute state rather than a
//! delta. Losing a message only delays a visual update.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::session::PeerId;
use crate::camera::LookAngles;

/// A message published by the peer that owns a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetMessage {
    /// Body yaw target and current speed. Receivers ease the body toward `yaw`.
    BodyOrientation {
        peer: PeerId,
        /// Target yaw in degrees
        yaw: f32,
        /// Velocity magnitude in units per second
        speed: f32,
    },
    /// Resulting head look angles after mouse input.
    HeadOrientation { peer: PeerId, angles: LookAngles },
    /// Inputs for the animation graph.
    AnimationState {
        peer: PeerId,
        wish_velocity: Vec3,
        velocity: Vec3,
        aim: Quat,
        grounded: bool,
        /// 0.0 standing, 1.0 fully crouched
        duck_level: f32,
    },
    /// One-shot jump animation cue.
    JumpCue { peer: PeerId },
    /// Root position of the owner's player.
    PlayerPosition { peer: PeerId, translation: Vec3 },
    /// The host spawned a player for `peer`. Peers without one spawn a matching player.
    PlayerSpawned {
        peer: PeerId,
        name: String,
        translation: Vec3,
        /// Initial look yaw in degrees
        yaw: f32,
    },
}

/// Discriminant used to coalesce messages within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    BodyOrientation,
    HeadOrientation,
    AnimationState,
    JumpCue,
    PlayerPosition,
    PlayerSpawned,
}

impl NetMessage {
    /// The peer that owns the player this message describes.
    pub fn peer(&self) -> PeerId {
        match self {
            NetMessage::BodyOrientation { peer, .. }
            | NetMessage::HeadOrientation { peer, .. }
            | NetMessage::AnimationState { peer, .. }
            | NetMessage::JumpCue { peer }
            | NetMessage::PlayerPosition { peer, .. }
            | NetMessage::PlayerSpawned { peer, .. } => *peer,
        }
    }

    /// True when the peer the message describes is also its sender.
    ///
    /// Spawns are sent by the host on the owner's behalf.
    pub fn is_from_owner(&self) -> bool {
        !matches!(self, NetMessage::PlayerSpawned { .. })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            NetMessage::BodyOrientation { .. } => MessageKind::BodyOrientation,
            NetMessage::HeadOrientation { .. } => MessageKind::HeadOrientation,
            NetMessage::AnimationState { .. } => MessageKind::AnimationState,
            NetMessage::JumpCue { .. } => MessageKind::JumpCue,
            NetMessage::PlayerPosition { .. } => MessageKind::PlayerPosition,
            NetMessage::PlayerSpawned { .. } => MessageKind::PlayerSpawned,
        }
    }
}
