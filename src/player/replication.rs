//! Owner-to-peer replication of body yaw, animation state, and position.
//!
//! Owners queue broadcasts in `BroadcastSet::Send`; every peer (the owner
//! included) applies the replayed messages in `BroadcastSet::Receive`.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::animation::AnimationParams;
use super::components::*;
use super::crouch::CrouchState;
use crate::core::lerp_factor;
use crate::net::{Broadcaster, NetMessage, NetworkOwner, NetworkSession, PeerId, ReceivedBroadcast};

/// Yaw of a rotation around +Y, in degrees.
pub fn yaw_degrees(rotation: Quat) -> f32 {
    rotation.to_euler(EulerRot::YXZ).0.to_degrees()
}

/// Whether the body should turn toward `target` this tick.
pub fn needs_turn(current: Quat, target: Quat, speed: f32, config: &MovementConfig) -> bool {
    current.angle_between(target).to_degrees() > config.rotate_threshold_degrees
        || speed > config.rotate_speed_threshold
}

/// Ease the body rotation toward `target`.
pub fn turn_body(current: Quat, target: Quat, dt: f32, config: &MovementConfig) -> Quat {
    current.slerp(target, lerp_factor(config.rotate_velocity, dt))
}

fn find_player<'a>(
    players: impl Iterator<Item = (&'a NetworkOwner, &'a PlayerParts)>,
    peer: PeerId,
) -> Option<&'a PlayerParts> {
    players
        .filter(|(owner, _)| owner.0 == peer)
        .map(|(_, parts)| parts)
        .next()
}

/// Queue the head yaw and speed when the body needs to follow.
pub fn broadcast_body_yaw(
    session: Res<NetworkSession>,
    config: Res<MovementConfig>,
    mut broadcaster: Broadcaster,
    players: Query<(&NetworkOwner, &PlayerParts, &CharacterBody), With<Player>>,
    heads: Query<&Transform, (With<Head>, Without<Body>)>,
    bodies: Query<&Transform, (With<Body>, Without<Head>)>,
) {
    for (owner, parts, character) in players.iter() {
        if owner.is_proxy(&session) {
            continue;
        }
        let (Ok(head), Ok(body)) = (heads.get(parts.head), bodies.get(parts.body)) else {
            continue;
        };

        let yaw = yaw_degrees(head.rotation);
        let speed = character.speed();
        let target = Quat::from_rotation_y(yaw.to_radians());
        if needs_turn(body.rotation, target, speed, &config) {
            broadcaster.send(NetMessage::BodyOrientation { peer: owner.0, yaw, speed });
        }
    }
}

/// Queue the owner's animation inputs.
pub fn broadcast_animation(
    session: Res<NetworkSession>,
    mut broadcaster: Broadcaster,
    players: Query<(&NetworkOwner, &PlayerParts, &PlayerMotor, &CharacterBody, &CrouchState), With<Player>>,
    heads: Query<&Transform, With<Head>>,
) {
    for (owner, parts, motor, body, crouch) in players.iter() {
        if owner.is_proxy(&session) {
            continue;
        }
        let Ok(head) = heads.get(parts.head) else {
            continue;
        };

        broadcaster.send(NetMessage::AnimationState {
            peer: owner.0,
            wish_velocity: motor.wish_velocity,
            velocity: body.velocity,
            aim: head.rotation,
            grounded: body.on_ground,
            duck_level: if crouch.is_crouched() { 1.0 } else { 0.0 },
        });
    }
}

/// Queue the owner's position when it moved.
pub fn broadcast_position(
    session: Res<NetworkSession>,
    mut broadcaster: Broadcaster,
    players: Query<(&NetworkOwner, &Transform), (With<Player>, Changed<Transform>)>,
) {
    for (owner, transform) in players.iter() {
        if owner.is_proxy(&session) {
            continue;
        }
        broadcaster.send(NetMessage::PlayerPosition {
            peer: owner.0,
            translation: transform.translation,
        });
    }
}

/// Turn bodies toward replayed yaw targets.
pub fn apply_body_orientation(
    time: Res<Time>,
    config: Res<MovementConfig>,
    mut events: EventReader<ReceivedBroadcast>,
    players: Query<(&NetworkOwner, &PlayerParts), With<Player>>,
    mut bodies: Query<&mut Transform, With<Body>>,
) {
    let dt = time.delta_secs();

    for ReceivedBroadcast(message) in events.read() {
        let NetMessage::BodyOrientation { peer, yaw, speed } = message else {
            continue;
        };
        let Some(parts) = find_player(players.iter(), *peer) else {
            continue;
        };
        let Ok(mut body) = bodies.get_mut(parts.body) else {
            continue;
        };

        let target = Quat::from_rotation_y(yaw.to_radians());
        if needs_turn(body.rotation, target, *speed, &config) {
            body.rotation = turn_body(body.rotation, target, dt, &config);
        }
    }
}

/// Height a proxy's collider takes for a replicated duck level.
pub fn proxy_height(body: &CharacterBody, duck_level: f32) -> f32 {
    if duck_level >= 0.5 {
        body.standing_height / 2.0
    } else {
        body.standing_height
    }
}

/// Write replayed animation state and jump cues into `AnimationParams`.
///
/// Proxies also resize their collider to the owner's crouch, which is not
/// simulated locally.
pub fn apply_animation_state(
    session: Res<NetworkSession>,
    mut events: EventReader<ReceivedBroadcast>,
    mut players: Query<(&NetworkOwner, &mut AnimationParams, &mut CharacterBody, &mut Collider), With<Player>>,
) {
    for ReceivedBroadcast(message) in events.read() {
        let peer = message.peer();
        let Some((owner, mut params, mut body, mut collider)) =
            players.iter_mut().find(|(owner, ..)| owner.0 == peer)
        else {
            continue;
        };

        match message {
            NetMessage::AnimationState { wish_velocity, velocity, aim, grounded, duck_level, .. } => {
                params.apply_state(*wish_velocity, *velocity, *aim, *grounded, *duck_level);

                let height = proxy_height(&body, *duck_level);
                if owner.is_proxy(&session) && body.height != height {
                    body.height = height;
                    *collider = body.collider();
                }
            }
            NetMessage::JumpCue { .. } => params.trigger_jump(),
            _ => {}
        }
    }
}

/// Move proxies to their owner's replayed position.
pub fn apply_remote_position(
    session: Res<NetworkSession>,
    mut events: EventReader<ReceivedBroadcast>,
    mut players: Query<(&NetworkOwner, &mut Transform), With<Player>>,
) {
    for ReceivedBroadcast(message) in events.read() {
        let NetMessage::PlayerPosition { peer, translation } = message else {
            continue;
        };
        for (owner, mut transform) in players.iter_mut() {
            if owner.0 == *peer && owner.is_proxy(&session) {
                transform.translation = *translation;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{flush_broadcasts, Inbox, Outbox, PendingBroadcasts};

    #[test]
    fn yaw_round_trips_through_rotation() {
        let rotation = Quat::from_euler(EulerRot::YXZ, 1.0, -0.4, 0.0);
        assert!((yaw_degrees(rotation) - 1.0_f32.to_degrees()).abs() < 1e-3);
    }

    #[test]
    fn small_offsets_at_rest_do_not_turn() {
        let config = MovementConfig::default();
        let target = Quat::from_rotation_y(0.5_f32.to_radians());
        assert!(!needs_turn(Quat::IDENTITY, target, 0.0, &config));

        let far = Quat::from_rotation_y(30_f32.to_radians());
        assert!(needs_turn(Quat::IDENTITY, far, 0.0, &config));
        assert!(needs_turn(Quat::IDENTITY, target, config.rotate_speed_threshold * 2.0, &config));
    }

    #[test]
    fn turning_interpolates_instead_of_snapping() {
        let config = MovementConfig::default();
        let target = Quat::from_rotation_y(90_f32.to_radians());
        let turned = turn_body(Quat::IDENTITY, target, 0.1, &config);
        let angle = yaw_degrees(turned);
        // rotate_velocity 5 * dt 0.1 = halfway.
        assert!((angle - 45.0).abs() < 1e-2, "{angle}");
        assert!(turn_body(Quat::IDENTITY, target, 10.0, &config).angle_between(target) < 1e-3);
    }

    fn spawn_rig(world: &mut World, peer: PeerId) -> (Entity, Entity) {
        let head = world.spawn((Head, Transform::default())).id();
        let body = world.spawn((Body, Transform::default())).id();
        let camera = world.spawn_empty().id();
        let character = CharacterBody::new(&MovementConfig::default());
        let root = world
            .spawn((
                Player,
                NetworkOwner(peer),
                PlayerParts { head, body, camera },
                character.collider(),
                character,
                PlayerMotor::default(),
                CrouchState::Crouching,
                AnimationParams::default(),
                Transform::default(),
            ))
            .id();
        (root, head)
    }

    #[test]
    fn owner_animation_state_is_replayed_onto_its_own_params() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<NetworkSession>()
            .init_resource::<PendingBroadcasts>()
            .init_resource::<Outbox>()
            .init_resource::<Inbox>()
            .add_event::<ReceivedBroadcast>()
            .add_systems(Update, (broadcast_animation, flush_broadcasts, apply_animation_state).chain());

        let local = app.world().resource::<NetworkSession>().local_peer();
        let (root, head) = spawn_rig(app.world_mut(), local);
        let (proxy, _) = spawn_rig(app.world_mut(), PeerId(42));
        let aim = Quat::from_rotation_y(1.0);
        app.world_mut().get_mut::<Transform>(head).unwrap().rotation = aim;

        app.update();

        let params = app.world().get::<AnimationParams>(root).unwrap();
        assert_eq!(params.duck_level, 1.0);
        assert_eq!(params.aim, aim);
        // Proxies are never driven by local state.
        assert_eq!(app.world().get::<AnimationParams>(proxy).unwrap().duck_level, 0.0);
    }

    #[test]
    fn remote_position_moves_only_proxies() {
        let mut app = App::new();
        app.init_resource::<NetworkSession>()
            .init_resource::<PendingBroadcasts>()
            .init_resource::<Outbox>()
            .init_resource::<Inbox>()
            .add_event::<ReceivedBroadcast>()
            .add_systems(Update, (flush_broadcasts, apply_remote_position).chain());

        let (proxy, _) = spawn_rig(app.world_mut(), PeerId(42));
        app.world_mut().resource_mut::<Inbox>().push(NetMessage::PlayerPosition {
            peer: PeerId(42),
            translation: Vec3::new(1.0, 2.0, 3.0),
        });
        app.update();

        assert_eq!(
            app.world().get::<Transform>(proxy).unwrap().translation,
            Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn proxy_collider_follows_the_owners_duck_level() {
        let mut app = App::new();
        app.init_resource::<NetworkSession>()
            .init_resource::<PendingBroadcasts>()
            .init_resource::<Outbox>()
            .init_resource::<Inbox>()
            .add_event::<ReceivedBroadcast>()
            .add_systems(Update, (flush_broadcasts, apply_animation_state).chain());

        let (proxy, _) = spawn_rig(app.world_mut(), PeerId(42));
        let crouched = |duck_level| NetMessage::AnimationState {
            peer: PeerId(42),
            wish_velocity: Vec3::ZERO,
            velocity: Vec3::ZERO,
            aim: Quat::IDENTITY,
            grounded: true,
            duck_level,
        };

        app.world_mut().resource_mut::<Inbox>().push(crouched(1.0));
        app.update();
        let body = app.world().get::<CharacterBody>(proxy).unwrap();
        assert_eq!(body.height, body.standing_height / 2.0);
        let capsule = app.world().get::<Collider>(proxy).and_then(|c| c.as_capsule().map(|c| c.height()));
        assert!(capsule.is_some_and(|h| (h - 0.3).abs() < 1e-5), "{capsule:?}");

        app.world_mut().resource_mut::<Inbox>().push(crouched(0.0));
        app.update();
        let body = app.world().get::<CharacterBody>(proxy).unwrap();
        assert_eq!(body.height, body.standing_height);
    }
}
