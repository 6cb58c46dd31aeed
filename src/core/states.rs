//! Game state definitions that control the overall flow of a session.
//!
//! Player movement and mouse look only run while `InGame`; the lobby is
//! created while `Loading`.

use bevy::prelude::*;

/// Main game states.
///
/// - Start in `Loading` while configs are read and the lobby is created
/// - Move to `InGame` once the session is up
/// - `Paused` releases the cursor and freezes local input
#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    /// Reading configs and creating the lobby
    #[default]
    Loading,
    /// Active gameplay
    InGame,
    /// Local input is frozen, the session keeps running
    Paused,
}
