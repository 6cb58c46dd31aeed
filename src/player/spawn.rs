//! Player rig spawning.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::animation::AnimationParams;
use super::components::*;
use super::crouch::CrouchState;
use crate::camera::{CameraConfig, CameraRig, LookAngles};
use crate::core::SmoothTranslation;
use crate::net::{NetworkOwner, PeerId};
use crate::physics::player_collision_groups;

/// Spawn a networked player rig owned by `owner` at `location`.
///
/// The root never rotates; the spawn rotation becomes the initial look yaw.
/// The camera starts inactive and is enabled for the owning peer only.
#[allow(clippy::too_many_arguments)]
pub fn spawn_player(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    movement: &MovementConfig,
    camera_config: &CameraConfig,
    owner: PeerId,
    name: &str,
    location: Transform,
) -> Entity {
    let body_state = CharacterBody::new(movement);
    let yaw = location.rotation.to_euler(EulerRot::YXZ).0.to_degrees();
    let angles = LookAngles::from_yaw(yaw);

    let head = commands
        .spawn((
            Head,
            angles,
            SmoothTranslation::new(movement.crouch_speed_cam),
            Transform::from_xyz(0.0, movement.head_height, 0.0).with_rotation(angles.rotation()),
            Visibility::default(),
        ))
        .id();

    let body_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.55, 0.5, 0.45),
        perceptual_roughness: 0.9,
        ..default()
    });
    let visor_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.1, 0.1, 0.12),
        ..default()
    });

    let body = commands
        .spawn((
            Body,
            Mesh3d(meshes.add(Capsule3d::new(
                movement.radius,
                (movement.standing_height - 2.0 * movement.radius).max(0.0),
            ))),
            MeshMaterial3d(body_material),
            Transform::from_xyz(0.0, movement.standing_height / 2.0, 0.0)
                .with_rotation(Quat::from_rotation_y(yaw.to_radians())),
        ))
        .with_children(|body| {
            // Visor so the facing direction reads at a glance
            body.spawn((
                Mesh3d(meshes.add(Cuboid::new(movement.radius * 1.2, 0.12, 0.1))),
                MeshMaterial3d(visor_material),
                Transform::from_xyz(0.0, movement.head_height - movement.standing_height / 2.0, -movement.radius),
            ));
        })
        .id();

    let player = commands
        .spawn((
            Player,
            Name::new(name.to_string()),
            NetworkOwner(owner),
            PlayerMotor::default(),
            CrouchState::default(),
            AnimationParams::default(),
            Transform::from_translation(location.translation),
            Visibility::default(),
            // Rapier physics components
            RigidBody::KinematicPositionBased,
            body_state.collider(),
            player_collision_groups(),
            KinematicCharacterController {
                offset: CharacterLength::Absolute(0.01),
                autostep: Some(CharacterAutostep {
                    max_height: CharacterLength::Absolute(0.4),
                    min_width: CharacterLength::Absolute(0.3),
                    include_dynamic_bodies: false,
                }),
                max_slope_climb_angle: 45_f32.to_radians(),
                min_slope_slide_angle: 30_f32.to_radians(),
                snap_to_ground: Some(CharacterLength::Absolute(0.3)),
                filter_groups: Some(player_collision_groups()),
                ..default()
            },
            body_state,
        ))
        .add_children(&[head, body])
        .id();

    let camera = commands
        .spawn((
            Name::new(format!("{} Camera", name)),
            CameraRig::new(player, head, body, camera_config),
            Camera3d::default(),
            Camera {
                is_active: false,
                ..default()
            },
            Projection::Perspective(PerspectiveProjection {
                fov: camera_config.fov_degrees.to_radians(),
                ..default()
            }),
            Transform::from_translation(location.translation + Vec3::Y * movement.head_height)
                .with_rotation(angles.rotation()),
        ))
        .id();

    commands.entity(player).insert(PlayerParts { head, body, camera });

    info!("Spawned {} for {} at {}", name, owner, location.translation);
    player
}
