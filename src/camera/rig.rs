//! First/third-person camera rig.
//!
//! The head carries the look angles. The camera is a separate top-level
//! entity that sits at the head in first person, or is pulled back along the
//! view direction in third person and stopped short of any geometry.

use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::load_or_default;
use crate::input::ActionState;
use crate::net::{Broadcaster, NetMessage, NetworkOwner, NetworkSession, ReceivedBroadcast};
use crate::physics::{RapierTrace, SceneTrace};
use crate::player::{Head, Player, PlayerParts};

/// Render layer the local body moves to in first person.
///
/// The player camera only draws layer 0, while lights see both, so the body
/// still casts shadows.
pub const SHADOW_ONLY_LAYER: usize = 2;

/// Look angles in degrees. Positive pitch looks up.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LookAngles {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl LookAngles {
    /// Pitch is kept strictly inside straight up/down so the view never flips.
    pub const PITCH_LIMIT: f32 = 89.9;

    pub fn from_yaw(yaw: f32) -> Self {
        Self { yaw, ..default() }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }
}

/// Apply one frame of mouse movement. Yaw is left unbounded.
pub fn apply_mouse_delta(angles: LookAngles, delta: Vec2, sensitivity: Vec2) -> LookAngles {
    LookAngles {
        pitch: (angles.pitch - delta.y * sensitivity.y)
            .clamp(-LookAngles::PITCH_LIMIT, LookAngles::PITCH_LIMIT),
        yaw: angles.yaw - delta.x * sensitivity.x,
        roll: angles.roll,
    }
}

/// Where the camera goes for a head at `head` looking along `forward`.
///
/// A blocked boom puts the camera at the hit point pushed out along the
/// surface normal.
pub fn resolve_camera_position(
    head: Vec3,
    forward: Vec3,
    distance: f32,
    trace: Option<&dyn SceneTrace>,
) -> Vec3 {
    if distance == 0.0 {
        return head;
    }

    let end = head - forward * distance;
    let Some(trace) = trace else {
        return end;
    };

    match trace.ray(head, end).hit {
        Some(hit) => hit.position + hit.normal,
        None => end,
    }
}

/// How the local body is drawn.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRenderMode {
    /// Visible to the camera and casting shadows
    Full,
    /// Hidden from the camera, still casting shadows
    ShadowsOnly,
}

impl BodyRenderMode {
    pub fn for_distance(distance: f32) -> Self {
        if distance == 0.0 {
            BodyRenderMode::ShadowsOnly
        } else {
            BodyRenderMode::Full
        }
    }

    pub fn layers(self) -> RenderLayers {
        match self {
            BodyRenderMode::Full => RenderLayers::layer(0),
            BodyRenderMode::ShadowsOnly => RenderLayers::layer(SHADOW_ONLY_LAYER),
        }
    }
}

/// Camera tuning loaded from assets/data/camera.ron.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Third-person boom length (0 = first person)
    pub distance: f32,
    /// Degrees of yaw per pixel of horizontal mouse movement
    pub mouse_x_sens: f32,
    /// Degrees of pitch per pixel of vertical mouse movement
    pub mouse_y_sens: f32,
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 0.0,
            mouse_x_sens: 0.1,
            mouse_y_sens: 0.1,
            fov_degrees: 80.0,
        }
    }
}

impl CameraConfig {
    pub fn load() -> Self {
        load_or_default("camera.ron")
    }
}

/// Camera rig for one player.
#[derive(Component, Debug, Clone)]
pub struct CameraRig {
    pub player: Entity,
    pub head: Entity,
    pub body: Entity,
    pub distance: f32,
    pub sensitivity: Vec2,
}

impl CameraRig {
    pub fn new(player: Entity, head: Entity, body: Entity, config: &CameraConfig) -> Self {
        Self {
            player,
            head,
            body,
            distance: config.distance,
            sensitivity: Vec2::new(config.mouse_x_sens, config.mouse_y_sens),
        }
    }

    pub fn is_first_person(&self) -> bool {
        self.distance == 0.0
    }
}

/// Set once a rig's camera has been enabled or left off for its owner.
#[derive(Component)]
pub struct OwnerCameraChecked;

/// Only the owning peer looks through a player's camera.
pub fn activate_owner_camera(
    mut commands: Commands,
    session: Res<NetworkSession>,
    owners: Query<&NetworkOwner>,
    mut rigs: Query<(Entity, &CameraRig, &mut Camera), Without<OwnerCameraChecked>>,
) {
    for (entity, rig, mut camera) in rigs.iter_mut() {
        let Ok(owner) = owners.get(rig.player) else {
            continue;
        };
        camera.is_active = !owner.is_proxy(&session);
        commands.entity(entity).insert(OwnerCameraChecked);
    }
}

/// Turn mouse movement into head rotation and broadcast the result.
pub fn mouse_look(
    actions: Res<ActionState>,
    session: Res<NetworkSession>,
    mut broadcaster: Broadcaster,
    rigs: Query<&CameraRig>,
    owners: Query<&NetworkOwner>,
    mut heads: Query<(&mut LookAngles, &mut Transform), With<Head>>,
) {
    if actions.mouse_delta == Vec2::ZERO {
        return;
    }

    for rig in rigs.iter() {
        let Ok(owner) = owners.get(rig.player) else {
            continue;
        };
        if owner.is_proxy(&session) {
            continue;
        }
        let Ok((mut angles, mut transform)) = heads.get_mut(rig.head) else {
            continue;
        };

        *angles = apply_mouse_delta(*angles, actions.mouse_delta, rig.sensitivity);
        transform.rotation = angles.rotation();
        broadcaster.send(NetMessage::HeadOrientation { peer: owner.0, angles: *angles });
    }
}

/// Aim proxy heads with replayed look angles.
pub fn apply_head_orientation(
    session: Res<NetworkSession>,
    mut events: EventReader<ReceivedBroadcast>,
    players: Query<(&NetworkOwner, &PlayerParts), With<Player>>,
    mut heads: Query<(&mut LookAngles, &mut Transform), With<Head>>,
) {
    for ReceivedBroadcast(message) in events.read() {
        let NetMessage::HeadOrientation { peer, angles } = message else {
            continue;
        };
        // The owner already applied its own input.
        if *peer == session.local_peer() {
            continue;
        }
        let Some((_, parts)) = players.iter().find(|(owner, _)| owner.0 == *peer) else {
            continue;
        };
        let Ok((mut head_angles, mut transform)) = heads.get_mut(parts.head) else {
            continue;
        };
        *head_angles = *angles;
        transform.rotation = angles.rotation();
    }
}

/// Move the owner's camera to the head, or out on the third-person boom.
#[allow(clippy::type_complexity)]
pub fn place_camera(
    session: Res<NetworkSession>,
    rapier_context: Query<&RapierContext>,
    players: Query<(&NetworkOwner, &Transform), (With<Player>, Without<CameraRig>)>,
    heads: Query<(&Transform, &LookAngles), (With<Head>, Without<CameraRig>)>,
    mut rigs: Query<(&CameraRig, &mut Transform), (Without<Player>, Without<Head>)>,
) {
    let trace = rapier_context.get_single().ok().map(RapierTrace::new);
    let trace = trace.as_ref().map(|t| t as &dyn SceneTrace);

    for (rig, mut camera_transform) in rigs.iter_mut() {
        let Ok((owner, player_transform)) = players.get(rig.player) else {
            continue;
        };
        if owner.is_proxy(&session) {
            continue;
        }
        let Ok((head_transform, angles)) = heads.get(rig.head) else {
            continue;
        };

        let head_position = player_transform.transform_point(head_transform.translation);
        camera_transform.translation =
            resolve_camera_position(head_position, angles.forward(), rig.distance, trace);
        camera_transform.rotation = angles.rotation();
    }
}

/// Hide the owner's body from its own first-person camera.
///
/// Layers are re-checked every frame so clothing scenes that finish loading
/// later pick them up too.
pub fn update_body_render_mode(
    mut commands: Commands,
    session: Res<NetworkSession>,
    rigs: Query<&CameraRig>,
    owners: Query<&NetworkOwner>,
    modes: Query<Option<&BodyRenderMode>>,
    current_layers: Query<Option<&RenderLayers>>,
    children: Query<&Children>,
) {
    for rig in rigs.iter() {
        let Ok(owner) = owners.get(rig.player) else {
            continue;
        };
        if owner.is_proxy(&session) {
            continue;
        }
        let Ok(current) = modes.get(rig.body) else {
            continue;
        };

        let wanted = BodyRenderMode::for_distance(rig.distance);
        if current != Some(&wanted) {
            commands.entity(rig.body).insert(wanted);
        }

        let layers = wanted.layers();
        for entity in std::iter::once(rig.body).chain(children.iter_descendants(rig.body)) {
            if current_layers.get(entity).ok().flatten() != Some(&layers) {
                commands.entity(entity).insert(layers.clone());
            }
        }
    }
}
