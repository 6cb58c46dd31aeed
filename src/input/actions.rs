//! Named-action input polling.
//!
//! Gameplay code never looks at raw key codes. It asks for actions like
//! `Action::Crouch` through [`ActionState`], which is sampled once per frame
//! from the keyboard using [`InputBindings`].

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use std::collections::HashMap;

/// Gameplay actions that can be bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Run,
    Crouch,
    Jump,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Forward,
        Action::Backward,
        Action::Left,
        Action::Right,
        Action::Run,
        Action::Crouch,
        Action::Jump,
    ];
}

/// Key bindings for each action. An action is down if any of its keys is.
#[derive(Resource, Debug, Clone)]
pub struct InputBindings {
    pub keys: HashMap<Action, Vec<KeyCode>>,
}

impl Default for InputBindings {
    fn default() -> Self {
        let keys = HashMap::from([
            (Action::Forward, vec![KeyCode::KeyW, KeyCode::ArrowUp]),
            (Action::Backward, vec![KeyCode::KeyS, KeyCode::ArrowDown]),
            (Action::Left, vec![KeyCode::KeyA, KeyCode::ArrowLeft]),
            (Action::Right, vec![KeyCode::KeyD, KeyCode::ArrowRight]),
            (Action::Run, vec![KeyCode::ShiftLeft]),
            (Action::Crouch, vec![KeyCode::ControlLeft, KeyCode::KeyC]),
            (Action::Jump, vec![KeyCode::Space]),
        ]);
        Self { keys }
    }
}

impl InputBindings {
    /// Keys bound to an action (empty if unbound).
    pub fn keys_for(&self, action: Action) -> &[KeyCode] {
        self.keys.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Per-frame snapshot of every action plus the accumulated mouse delta.
#[derive(Resource, Debug, Default, Clone)]
pub struct ActionState {
    down: HashMap<Action, bool>,
    pressed: HashMap<Action, bool>,
    released: HashMap<Action, bool>,
    /// Mouse movement accumulated this frame, in pixels
    pub mouse_delta: Vec2,
}

impl ActionState {
    /// Held this frame.
    pub fn down(&self, action: Action) -> bool {
        self.down.get(&action).copied().unwrap_or(false)
    }

    /// Went down this frame.
    pub fn pressed(&self, action: Action) -> bool {
        self.pressed.get(&action).copied().unwrap_or(false)
    }

    /// Went up this frame.
    pub fn released(&self, action: Action) -> bool {
        self.released.get(&action).copied().unwrap_or(false)
    }

    /// Overwrite one action's state. Used by the sampler and by tests.
    pub fn set(&mut self, action: Action, down: bool, pressed: bool, released: bool) {
        self.down.insert(action, down);
        self.pressed.insert(action, pressed);
        self.released.insert(action, released);
    }
}

/// Input plugin - samples actions before gameplay systems run.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InputBindings>()
            .init_resource::<ActionState>()
            .add_systems(PreUpdate, sample_actions.after(bevy::input::InputSystem));
    }
}

/// Rebuild the action snapshot from keyboard and mouse state.
pub fn sample_actions(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mut mouse_motion: EventReader<MouseMotion>,
    bindings: Res<InputBindings>,
    mut state: ResMut<ActionState>,
) {
    let mut delta = Vec2::ZERO;
    for event in mouse_motion.read() {
        delta += event.delta;
    }
    state.mouse_delta = delta;

    let Some(keyboard) = keyboard else {
        return;
    };

    for action in Action::ALL {
        let keys = bindings.keys_for(action);
        state.set(
            action,
            keys.iter().any(|k| keyboard.pressed(*k)),
            keys.iter().any(|k| keyboard.just_pressed(*k)),
            keys.iter().any(|k| keyboard.just_released(*k)),
        );
    }
}
