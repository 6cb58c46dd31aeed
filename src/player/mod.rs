//! Player module - networked movement controller, crouch, and replication.

mod animation;
mod components;
mod crouch;
mod movement;
mod plugin;
mod replication;
mod spawn;

pub use animation::*;
pub use components::*;
pub use crouch::{headroom_clear, CrouchState, HeightChange};
pub use movement::{finish_move, integrate, wish_velocity};
pub use plugin::PlayerPlugin;
pub use replication::*;
pub use spawn::spawn_player;
