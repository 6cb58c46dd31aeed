//! Arena construction: floor, walls, a crouch tunnel, cover blocks, and spawn points.

use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use bevy_rapier3d::prelude::*;

use crate::camera::SHADOW_ONLY_LAYER;
use crate::net::SpawnPoint;

/// Marker for all arena geometry.
#[derive(Component)]
pub struct ArenaGeometry;

/// Half the side length of the square arena.
pub const ARENA_HALF_SIZE: f32 = 20.0;

/// Underside height of the crouch tunnel roof. Above crouched, below standing height.
pub const TUNNEL_CEILING: f32 = 1.3;

struct ArenaMaterials {
    floor: Handle<StandardMaterial>,
    wall: Handle<StandardMaterial>,
    block: Handle<StandardMaterial>,
}

impl ArenaMaterials {
    fn new(materials: &mut Assets<StandardMaterial>) -> Self {
        Self {
            floor: materials.add(StandardMaterial {
                base_color: Color::srgb(0.28, 0.27, 0.26),
                perceptual_roughness: 0.9,
                ..default()
            }),
            wall: materials.add(StandardMaterial {
                base_color: Color::srgb(0.32, 0.30, 0.28),
                perceptual_roughness: 0.8,
                ..default()
            }),
            block: materials.add(StandardMaterial {
                base_color: Color::srgb(0.35, 0.30, 0.25),
                perceptual_roughness: 0.7,
                ..default()
            }),
        }
    }
}

/// Spawn a solid box with its center at `center`.
fn spawn_block(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: &Handle<StandardMaterial>,
    center: Vec3,
    size: Vec3,
) {
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
        MeshMaterial3d(material.clone()),
        Transform::from_translation(center),
        Collider::cuboid(size.x / 2.0, size.y / 2.0, size.z / 2.0),
        ArenaGeometry,
    ));
}

/// Build the arena and light it.
pub fn setup_arena(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mats = ArenaMaterials::new(&mut materials);
    let size = ARENA_HALF_SIZE * 2.0;
    let wall_height = 4.0;
    let wall_thickness = 0.5;

    // Floor: top surface at y = 0
    spawn_block(&mut commands, &mut meshes, &mats.floor, Vec3::new(0.0, -0.25, 0.0), Vec3::new(size, 0.5, size));

    // Perimeter walls
    let half = ARENA_HALF_SIZE;
    for (center, extent) in [
        (Vec3::new(0.0, wall_height / 2.0, -half), Vec3::new(size, wall_height, wall_thickness)),
        (Vec3::new(0.0, wall_height / 2.0, half), Vec3::new(size, wall_height, wall_thickness)),
        (Vec3::new(-half, wall_height / 2.0, 0.0), Vec3::new(wall_thickness, wall_height, size)),
        (Vec3::new(half, wall_height / 2.0, 0.0), Vec3::new(wall_thickness, wall_height, size)),
    ] {
        spawn_block(&mut commands, &mut meshes, &mats.wall, center, extent);
    }

    // Crouch tunnel: two side walls and a low roof along X
    let tunnel_length = 6.0;
    let tunnel_width = 1.6;
    let tunnel_center = Vec3::new(0.0, 0.0, -8.0);
    for side in [-1.0, 1.0] {
        spawn_block(
            &mut commands,
            &mut meshes,
            &mats.wall,
            tunnel_center + Vec3::new(0.0, wall_height / 2.0, side * (tunnel_width / 2.0 + 0.25)),
            Vec3::new(tunnel_length, wall_height, 0.5),
        );
    }
    spawn_block(
        &mut commands,
        &mut meshes,
        &mats.block,
        tunnel_center + Vec3::new(0.0, TUNNEL_CEILING + 0.25, 0.0),
        Vec3::new(tunnel_length, 0.5, tunnel_width),
    );

    // Cover blocks for the third-person camera to bump into
    for (x, z, height) in [(6.0, 4.0, 2.0), (-7.0, 6.0, 3.0), (10.0, -10.0, 1.0), (-12.0, -3.0, 2.5)] {
        spawn_block(
            &mut commands,
            &mut meshes,
            &mats.block,
            Vec3::new(x, height / 2.0, z),
            Vec3::new(2.0, height, 2.0),
        );
    }

    // Scene spawn points, used when the network config lists none
    for (x, z, yaw) in [(-15.0, 15.0, 45.0), (15.0, 15.0, -45.0), (15.0, -15.0, -135.0), (-15.0, -15.0, 135.0)] {
        commands.spawn((
            SpawnPoint,
            Name::new("Spawn Point"),
            Transform::from_xyz(x, 0.1, z).with_rotation(Quat::from_rotation_y(f32::to_radians(yaw))),
        ));
    }

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.6, 0.6, 0.7),
        brightness: 300.0,
    });

    // Lights see the shadow-only layer so a first-person body still casts a shadow
    commands.spawn((
        DirectionalLight {
            color: Color::srgb(1.0, 0.96, 0.9),
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::XYZ,
            -std::f32::consts::FRAC_PI_3,
            std::f32::consts::FRAC_PI_6,
            0.0,
        )),
        RenderLayers::from_layers(&[0, SHADOW_ONLY_LAYER]),
        ArenaGeometry,
    ));

    info!("Arena ready");
}
