//! Crouch state machine.
//!
//! | From               | Input   | Headroom | To                 | Height   |
//! |--------------------|---------|----------|--------------------|----------|
//! | Standing           | press   | -        | Crouching          | halved   |
//! | Crouching          | release | clear    | Standing           | restored |
//! | Crouching          | release | blocked  | ForceCrouchPending | same     |
//! | ForceCrouchPending | press   | -        | Crouching          | same     |
//! | ForceCrouchPending | -       | clear    | Standing           | restored |
//! | ForceCrouchPending | -       | blocked  | ForceCrouchPending | same     |

use bevy::prelude::*;

use crate::physics::SceneTrace;

use super::components::MovementConfig;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrouchState {
    #[default]
    Standing,
    Crouching,
    /// Crouch was released but something is overhead; stand once it clears.
    ForceCrouchPending,
}

/// What the collider height should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightChange {
    None,
    Halve,
    Restore,
}

impl CrouchState {
    pub fn is_crouched(self) -> bool {
        self != CrouchState::Standing
    }

    /// Advance one tick. `can_stand` is only consulted when standing up is attempted.
    pub fn step(
        self,
        pressed: bool,
        released: bool,
        mut can_stand: impl FnMut() -> bool,
    ) -> (CrouchState, HeightChange) {
        let mut state = self;
        let mut height = HeightChange::None;

        if pressed {
            match state {
                CrouchState::Standing => {
                    state = CrouchState::Crouching;
                    height = HeightChange::Halve;
                }
                CrouchState::ForceCrouchPending => state = CrouchState::Crouching,
                CrouchState::Crouching => {}
            }
        }

        if released && state == CrouchState::Crouching {
            if can_stand() {
                return (CrouchState::Standing, combine(height, HeightChange::Restore));
            }
            return (CrouchState::ForceCrouchPending, height);
        }

        // Pending from an earlier tick: keep checking for headroom.
        if self == CrouchState::ForceCrouchPending && state == CrouchState::ForceCrouchPending && can_stand() {
            return (CrouchState::Standing, HeightChange::Restore);
        }

        (state, height)
    }
}

fn combine(first: HeightChange, second: HeightChange) -> HeightChange {
    match (first, second) {
        (HeightChange::Halve, HeightChange::Restore) => HeightChange::None,
        (HeightChange::None, other) => other,
        (first, HeightChange::None) => first,
        (_, second) => second,
    }
}

/// True when nothing blocks the head from rising to standing height.
///
/// Without a scene to trace against, the way up counts as clear.
pub fn headroom_clear(trace: Option<&dyn SceneTrace>, head: Vec3, config: &MovementConfig) -> bool {
    let Some(trace) = trace else {
        return true;
    };
    let top = head + Vec3::Y * config.trace_crouch_distance;
    !trace.sphere(head, top, config.stand_up_probe_radius).is_hit()
}
