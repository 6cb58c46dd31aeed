//! Player movement: wish velocity, ground/air integration, crouch, and jump.

use bevy::color::palettes::css::LIME;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::components::*;
use super::crouch::{headroom_clear, CrouchState, HeightChange};
use crate::core::SmoothTranslation;
use crate::input::{Action, ActionState};
use crate::net::{Broadcaster, NetMessage, NetworkOwner, NetworkSession};
use crate::physics::{RapierTrace, SceneTrace};

/// Horizontal velocity the player wants, from held movement actions and the look rotation.
///
/// The vertical component is always zero.
pub fn wish_velocity(
    actions: &ActionState,
    look: Quat,
    crouch: CrouchState,
    sprinting: bool,
    config: &MovementConfig,
) -> Vec3 {
    let mut wish = Vec3::ZERO;
    if actions.down(Action::Forward) {
        wish += look * Vec3::NEG_Z;
    }
    if actions.down(Action::Backward) {
        wish += look * Vec3::Z;
    }
    if actions.down(Action::Left) {
        wish += look * Vec3::NEG_X;
    }
    if actions.down(Action::Right) {
        wish += look * Vec3::X;
    }

    wish.y = 0.0;
    if wish.length_squared() > 1e-8 {
        wish = wish.normalize();
    } else {
        wish = Vec3::ZERO;
    }

    let speed = if crouch.is_crouched() {
        config.crouch_speed
    } else if sprinting {
        config.run_speed
    } else {
        config.speed
    };
    wish * speed
}

/// First half of a fixed step. Returns the translation to request from the controller.
///
/// Airborne bodies get half of `gravity * dt` here and the other half in
/// [`finish_move`], once the controller has moved them.
pub fn integrate(
    body: &mut CharacterBody,
    wish: Vec3,
    gravity: Vec3,
    dt: f32,
    config: &MovementConfig,
) -> Vec3 {
    if body.on_ground {
        body.velocity.y = 0.0;
        body.accelerate(wish, dt);
        body.apply_friction(config.ground_control, dt);
    } else {
        body.velocity += gravity * dt * 0.5;
        body.accelerate(wish.clamp_length_max(config.max_force), dt);
        body.apply_friction(config.air_control, dt);
    }

    body.velocity * dt
}

/// What the character controller made of a requested move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMove {
    /// Translation that was requested
    pub desired: Vec3,
    /// Translation actually applied
    pub effective: Vec3,
}

/// Second half of a fixed step, after the controller resolved the move.
///
/// Sliding along walls feeds back into horizontal velocity. An upward move
/// cut short by a ceiling loses the blocked part of its vertical velocity.
pub fn finish_move(body: &mut CharacterBody, grounded: bool, resolved: Option<ResolvedMove>, gravity: Vec3, dt: f32) {
    body.on_ground = grounded;

    if let Some(resolved) = resolved.filter(|_| dt > 0.0) {
        body.velocity.x = resolved.effective.x / dt;
        body.velocity.z = resolved.effective.z / dt;

        if resolved.desired.y > 0.0 && resolved.effective.y < resolved.desired.y {
            body.velocity.y = resolved.effective.y / dt;
        }
    }

    if grounded {
        body.velocity.y = 0.0;
    } else {
        body.velocity += gravity * dt * 0.5;
    }
}

fn current_gravity(rapier_config: &Query<&RapierConfiguration>, config: &MovementConfig) -> Vec3 {
    rapier_config
        .get_single()
        .map(|c| c.gravity)
        .unwrap_or(config.gravity)
}

/// Sprint while Run is held.
pub fn update_sprint(
    actions: Res<ActionState>,
    session: Res<NetworkSession>,
    mut players: Query<(&NetworkOwner, &mut PlayerMotor), With<Player>>,
) {
    for (owner, mut motor) in players.iter_mut() {
        if owner.is_proxy(&session) {
            continue;
        }
        motor.sprinting = actions.down(Action::Run);
    }
}

/// Players whose crouch state a peer steps.
pub type CrouchQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static NetworkOwner,
        &'static PlayerParts,
        &'static mut CrouchState,
        &'static mut CharacterBody,
        &'static mut Collider,
    ),
    With<Player>,
>;

/// Run the crouch state machine and resize the collider on transitions.
pub fn update_crouch(
    actions: Res<ActionState>,
    session: Res<NetworkSession>,
    config: Res<MovementConfig>,
    rapier_context: Query<&RapierContext>,
    heads: Query<&GlobalTransform, With<Head>>,
    mut players: CrouchQuery,
) {
    let trace = rapier_context.get_single().ok().map(RapierTrace::new);
    let trace = trace.as_ref().map(|t| t as &dyn SceneTrace);
    step_crouch(trace, &actions, &session, &config, &heads, &mut players);
}

/// One crouch tick for every locally owned player, tracing headroom with `trace`.
pub fn step_crouch(
    trace: Option<&dyn SceneTrace>,
    actions: &ActionState,
    session: &NetworkSession,
    config: &MovementConfig,
    heads: &Query<&GlobalTransform, With<Head>>,
    players: &mut CrouchQuery,
) {
    for (owner, parts, mut state, mut body, mut collider) in players.iter_mut() {
        if owner.is_proxy(session) {
            continue;
        }
        let Ok(head) = heads.get(parts.head) else {
            continue;
        };
        let head_position = head.translation();

        let (next, change) = state.step(
            actions.pressed(Action::Crouch),
            actions.released(Action::Crouch),
            || headroom_clear(trace, head_position, config),
        );

        match change {
            HeightChange::Halve => body.height = body.standing_height / 2.0,
            HeightChange::Restore => body.height = body.standing_height,
            HeightChange::None => {}
        }
        if change != HeightChange::None {
            *collider = body.collider();
        }

        if *state != next {
            debug!("{} crouch {:?} -> {:?}", owner.0, *state, next);
            *state = next;
        }
    }
}

/// Jump if grounded. The animation cue reaches every peer, us included, by broadcast.
pub fn jump(
    actions: Res<ActionState>,
    session: Res<NetworkSession>,
    config: Res<MovementConfig>,
    mut broadcaster: Broadcaster,
    mut players: Query<(&NetworkOwner, &mut CharacterBody), With<Player>>,
) {
    if !actions.pressed(Action::Jump) {
        return;
    }

    for (owner, mut body) in players.iter_mut() {
        if owner.is_proxy(&session) || !body.on_ground {
            continue;
        }
        body.punch(Vec3::Y * config.jump_force);
        broadcaster.send(NetMessage::JumpCue { peer: owner.0 });
    }
}

/// Ease the head down to half height while crouched.
pub fn smooth_head_height(
    config: Res<MovementConfig>,
    players: Query<(&PlayerParts, &CrouchState), With<Player>>,
    mut heads: Query<&mut SmoothTranslation, With<Head>>,
) {
    for (parts, state) in players.iter() {
        let Ok(mut smooth) = heads.get_mut(parts.head) else {
            continue;
        };
        let height = if state.is_crouched() {
            config.head_height / 2.0
        } else {
            config.head_height
        };
        smooth.target = Some(Vec3::Y * height);
        smooth.speed = config.crouch_speed_cam;
    }
}

/// Fixed step: turn held movement actions into a wish velocity.
pub fn build_wish_velocity(
    actions: Res<ActionState>,
    session: Res<NetworkSession>,
    config: Res<MovementConfig>,
    heads: Query<&Transform, With<Head>>,
    mut players: Query<(&NetworkOwner, &PlayerParts, &CrouchState, &mut PlayerMotor), With<Player>>,
) {
    for (owner, parts, crouch, mut motor) in players.iter_mut() {
        if owner.is_proxy(&session) {
            continue;
        }
        let Ok(head) = heads.get(parts.head) else {
            continue;
        };
        motor.wish_velocity = wish_velocity(&actions, head.rotation, *crouch, motor.sprinting, &config);
    }
}

/// Fixed step: accelerate and hand the move to the character controller.
pub fn integrate_movement(
    time: Res<Time>,
    session: Res<NetworkSession>,
    config: Res<MovementConfig>,
    rapier_config: Query<&RapierConfiguration>,
    mut players: Query<(
        &NetworkOwner,
        &mut PlayerMotor,
        &mut CharacterBody,
        &mut KinematicCharacterController,
    ), With<Player>>,
) {
    let dt = time.delta_secs();
    let gravity = current_gravity(&rapier_config, &config);

    for (owner, mut motor, mut body, mut controller) in players.iter_mut() {
        if owner.is_proxy(&session) {
            continue;
        }
        let translation = integrate(&mut body, motor.wish_velocity, gravity, dt, &config);
        controller.translation = Some(translation);
        motor.move_requested = true;
    }
}

/// Fixed step, after physics: ground state, slide response, and the second gravity half.
///
/// Only runs for bodies that requested a move this step. The controller
/// output is left in place between moves and must not be applied twice.
pub fn finish_movement(
    time: Res<Time>,
    session: Res<NetworkSession>,
    config: Res<MovementConfig>,
    rapier_config: Query<&RapierConfiguration>,
    mut players: Query<(
        &NetworkOwner,
        &mut PlayerMotor,
        &mut CharacterBody,
        Option<&KinematicCharacterControllerOutput>,
    ), With<Player>>,
) {
    let dt = time.delta_secs();
    let gravity = current_gravity(&rapier_config, &config);

    for (owner, mut motor, mut body, output) in players.iter_mut() {
        if owner.is_proxy(&session) || !motor.move_requested {
            continue;
        }
        motor.move_requested = false;

        let grounded = output.map_or(body.on_ground, |o| o.grounded);
        let resolved = output.map(|o| ResolvedMove {
            desired: o.desired_translation,
            effective: o.effective_translation,
        });
        finish_move(&mut body, grounded, resolved, gravity, dt);
    }
}

/// Draw the stand-up trace for locally owned players.
pub fn draw_crouch_trace(
    mut gizmos: Gizmos,
    config: Res<MovementConfig>,
    session: Res<NetworkSession>,
    players: Query<(&NetworkOwner, &PlayerParts), With<Player>>,
    heads: Query<&GlobalTransform, With<Head>>,
) {
    for (owner, parts) in players.iter() {
        if owner.is_proxy(&session) {
            continue;
        }
        let Ok(head) = heads.get(parts.head) else {
            continue;
        };
        let start = head.translation();
        gizmos.line(start, start + Vec3::Y * config.trace_crouch_distance, LIME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(actions: &[Action]) -> ActionState {
        let mut state = ActionState::default();
        for action in actions {
            state.set(*action, true, false, false);
        }
        state
    }

    #[test]
    fn wish_velocity_has_no_vertical_component() {
        let config = MovementConfig::default();
        let actions = holding(&[Action::Forward, Action::Right]);
        for pitch in [-89.9_f32, -45.0, 0.0, 30.0, 89.9] {
            let look = Quat::from_euler(EulerRot::YXZ, 0.7, pitch.to_radians(), 0.0);
            let wish = wish_velocity(&actions, look, CrouchState::Standing, false, &config);
            assert_eq!(wish.y, 0.0);
            assert!((wish.length() - config.speed).abs() < 1e-3, "pitch {pitch}: {wish}");
        }
    }

    #[test]
    fn wish_speed_follows_crouch_then_sprint() {
        let config = MovementConfig::default();
        let actions = holding(&[Action::Forward]);
        let speed = |crouch, sprint| wish_velocity(&actions, Quat::IDENTITY, crouch, sprint, &config).length();

        assert!((speed(CrouchState::Crouching, true) - config.crouch_speed).abs() < 1e-5);
        assert!((speed(CrouchState::ForceCrouchPending, false) - config.crouch_speed).abs() < 1e-5);
        assert!((speed(CrouchState::Standing, true) - config.run_speed).abs() < 1e-5);
        assert!((speed(CrouchState::Standing, false) - config.speed).abs() < 1e-5);
    }

    #[test]
    fn opposing_keys_cancel() {
        let config = MovementConfig::default();
        let actions = holding(&[Action::Forward, Action::Backward]);
        let wish = wish_velocity(&actions, Quat::IDENTITY, CrouchState::Standing, false, &config);
        assert_eq!(wish, Vec3::ZERO);
    }

    #[test]
    fn forward_follows_look_yaw() {
        let config = MovementConfig::default();
        let actions = holding(&[Action::Forward]);
        let look = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let wish = wish_velocity(&actions, look, CrouchState::Standing, false, &config);
        assert!((wish.normalize() - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn grounded_step_zeroes_vertical_velocity() {
        let config = MovementConfig::default();
        let mut body = CharacterBody::new(&config);
        body.on_ground = true;
        body.velocity = Vec3::new(0.0, -3.0, 0.0);

        let translation = integrate(&mut body, Vec3::X * config.speed, config.gravity, 1.0 / 60.0, &config);
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(translation.y, 0.0);
        assert!(body.velocity.x > 0.0);
    }

    #[test]
    fn airborne_step_splits_gravity_around_the_move() {
        let config = MovementConfig { air_control: 0.0, ..default() };
        let mut body = CharacterBody::new(&config);
        body.on_ground = false;
        body.velocity = Vec3::new(0.0, 2.0, 0.0);
        let gravity = Vec3::new(0.0, -10.0, 0.0);
        let dt = 0.02;

        let translation = integrate(&mut body, Vec3::ZERO, gravity, dt, &config);
        assert!((body.velocity.y - (2.0 - 0.1)).abs() < 1e-6);
        assert!((translation.y - (2.0 - 0.1) * dt).abs() < 1e-6);

        finish_move(&mut body, false, None, gravity, dt);
        assert!((body.velocity.y - (2.0 - 0.2)).abs() < 1e-6);
    }

    #[test]
    fn airborne_acceleration_is_clamped_to_max_force() {
        let config = MovementConfig { air_control: 0.0, ..default() };
        let mut body = CharacterBody::new(&config);
        body.on_ground = false;

        for _ in 0..1000 {
            integrate(&mut body, Vec3::X * config.run_speed, Vec3::ZERO, 0.01, &config);
        }
        assert!(body.velocity.x <= config.max_force + 1e-4);
    }

    #[test]
    fn landing_zeroes_vertical_velocity_and_keeps_slide() {
        let config = MovementConfig::default();
        let mut body = CharacterBody::new(&config);
        body.velocity = Vec3::new(3.0, -5.0, 0.0);

        let resolved = ResolvedMove {
            desired: Vec3::new(0.03, -0.05, 0.0),
            effective: Vec3::new(0.01, -0.1, 0.02),
        };
        finish_move(&mut body, true, Some(resolved), config.gravity, 0.01);
        assert!(body.on_ground);
        assert_eq!(body.velocity.y, 0.0);
        assert!((body.velocity.x - 1.0).abs() < 1e-5);
        assert!((body.velocity.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn ceiling_cancels_the_blocked_part_of_an_upward_move() {
        let config = MovementConfig::default();
        let mut body = CharacterBody::new(&config);
        body.velocity = Vec3::new(0.0, 4.0, 0.0);
        let dt = 1.0 / 64.0;
        let gravity = Vec3::new(0.0, -9.81, 0.0);

        let blocked = ResolvedMove { desired: Vec3::Y * 4.0 * dt, effective: Vec3::ZERO };
        finish_move(&mut body, false, Some(blocked), gravity, dt);
        assert!(body.velocity.y <= 0.0, "{}", body.velocity.y);

        let mut free = CharacterBody::new(&config);
        free.velocity = Vec3::new(0.0, 4.0, 0.0);
        let clear = ResolvedMove { desired: Vec3::Y * 4.0 * dt, effective: Vec3::Y * 4.0 * dt };
        finish_move(&mut free, false, Some(clear), gravity, dt);
        assert!((free.velocity.y - (4.0 + gravity.y * dt * 0.5)).abs() < 1e-5);
    }

    mod systems {
        use super::*;
        use crate::net::{flush_broadcasts, Inbox, Outbox, PendingBroadcasts, ReceivedBroadcast};
        use crate::physics::testing::FakeTrace;

        fn owner_app() -> (App, Entity) {
            let mut app = App::new();
            app.init_resource::<ActionState>()
                .init_resource::<MovementConfig>()
                .init_resource::<NetworkSession>()
                .init_resource::<PendingBroadcasts>()
                .init_resource::<Outbox>()
                .init_resource::<Inbox>()
                .add_event::<ReceivedBroadcast>();
            app.world_mut()
                .resource_mut::<NetworkSession>()
                .create_lobby("host", None);

            let local = app.world().resource::<NetworkSession>().local_peer();
            let config = MovementConfig::default();
            let body = CharacterBody::new(&config);
            let head = app
                .world_mut()
                .spawn((Head, GlobalTransform::from_xyz(0.0, config.head_height, 0.0)))
                .id();
            let body_entity = app.world_mut().spawn(Body).id();
            let camera = app.world_mut().spawn_empty().id();
            let player = app
                .world_mut()
                .spawn((
                    Player,
                    NetworkOwner(local),
                    PlayerParts { head, body: body_entity, camera },
                    CrouchState::default(),
                    body.collider(),
                    body,
                ))
                .id();
            (app, player)
        }

        fn press(app: &mut App, action: Action) {
            app.world_mut().resource_mut::<ActionState>().set(action, true, true, false);
        }

        fn release(app: &mut App, action: Action) {
            app.world_mut().resource_mut::<ActionState>().set(action, false, false, true);
        }

        fn idle(app: &mut App, action: Action) {
            app.world_mut().resource_mut::<ActionState>().set(action, false, false, false);
        }

        fn capsule_height(app: &App, player: Entity) -> f32 {
            app.world()
                .get::<Collider>(player)
                .and_then(|c| c.as_capsule().map(|capsule| capsule.height()))
                .expect("capsule collider")
        }

        fn under_low_ceiling(
            actions: Res<ActionState>,
            session: Res<NetworkSession>,
            config: Res<MovementConfig>,
            heads: Query<&GlobalTransform, With<Head>>,
            mut players: CrouchQuery,
        ) {
            let ceiling = FakeTrace::blocked(Vec3::Y * 2.0, Vec3::NEG_Y);
            step_crouch(Some(&ceiling as &dyn SceneTrace), &actions, &session, &config, &heads, &mut players);
        }

        #[test]
        fn crouching_halves_the_body_and_standing_restores_it() {
            let (mut app, player) = owner_app();
            app.add_systems(Update, update_crouch);
            let standing_capsule = capsule_height(&app, player);

            press(&mut app, Action::Crouch);
            app.update();
            let body = app.world().get::<CharacterBody>(player).unwrap();
            assert_eq!(body.height, body.standing_height / 2.0);
            assert_eq!(*app.world().get::<CrouchState>(player).unwrap(), CrouchState::Crouching);
            assert!(capsule_height(&app, player) < standing_capsule);

            // No physics world: nothing overhead, so release stands straight up.
            release(&mut app, Action::Crouch);
            app.update();
            let body = app.world().get::<CharacterBody>(player).unwrap();
            assert_eq!(body.height, body.standing_height);
            assert_eq!(*app.world().get::<CrouchState>(player).unwrap(), CrouchState::Standing);
            assert!((capsule_height(&app, player) - standing_capsule).abs() < 1e-5);
        }

        #[test]
        fn blocked_release_keeps_the_crouched_height() {
            let (mut app, player) = owner_app();
            app.add_systems(Update, under_low_ceiling);

            press(&mut app, Action::Crouch);
            app.update();
            let crouched_capsule = capsule_height(&app, player);

            release(&mut app, Action::Crouch);
            app.update();
            idle(&mut app, Action::Crouch);
            app.update();

            let body = app.world().get::<CharacterBody>(player).unwrap();
            assert_eq!(body.height, body.standing_height / 2.0);
            assert_eq!(
                *app.world().get::<CrouchState>(player).unwrap(),
                CrouchState::ForceCrouchPending
            );
            assert_eq!(capsule_height(&app, player), crouched_capsule);
        }

        #[test]
        fn jump_is_refused_in_the_air() {
            let (mut app, player) = owner_app();
            app.add_systems(Update, (jump, flush_broadcasts).chain());

            press(&mut app, Action::Jump);
            app.update();

            assert_eq!(app.world().get::<CharacterBody>(player).unwrap().velocity, Vec3::ZERO);
            assert!(app.world().resource::<Outbox>().is_empty());
        }

        #[test]
        fn grounded_jump_launches_and_broadcasts_a_cue() {
            let (mut app, player) = owner_app();
            app.add_systems(Update, (jump, flush_broadcasts).chain());
            app.world_mut().get_mut::<CharacterBody>(player).unwrap().on_ground = true;

            press(&mut app, Action::Jump);
            app.update();

            let config = MovementConfig::default();
            let body = app.world().get::<CharacterBody>(player).unwrap();
            assert_eq!(body.velocity.y, config.jump_force);
            assert!(!body.on_ground);

            let local = app.world().resource::<NetworkSession>().local_peer();
            let sent = app.world_mut().resource_mut::<Outbox>().drain();
            assert_eq!(sent, vec![NetMessage::JumpCue { peer: local }]);
        }

        #[test]
        fn paused_steps_do_not_reapply_a_stale_controller_output() {
            let (mut app, player) = owner_app();
            app.add_plugins(MinimalPlugins)
                .add_systems(Update, finish_movement);
            {
                let mut entity = app.world_mut().entity_mut(player);
                entity.insert((
                    PlayerMotor::default(),
                    KinematicCharacterControllerOutput {
                        grounded: true,
                        desired_translation: Vec3::new(0.1, 0.0, 0.0),
                        effective_translation: Vec3::new(0.1, 0.0, 0.0),
                        ..default()
                    },
                ));
                entity.get_mut::<CharacterBody>().unwrap().velocity = Vec3::new(0.0, 2.0, 0.0);
            }

            for _ in 0..20 {
                app.update();
            }
            let body = app.world().get::<CharacterBody>(player).unwrap();
            assert_eq!(body.velocity, Vec3::new(0.0, 2.0, 0.0));
            assert!(!body.on_ground);

            // Once a move is requested the output is consumed exactly once.
            app.world_mut().get_mut::<PlayerMotor>(player).unwrap().move_requested = true;
            app.update();
            assert!(app.world().get::<CharacterBody>(player).unwrap().on_ground);
            assert!(!app.world().get::<PlayerMotor>(player).unwrap().move_requested);
        }
    }
}
