//! World module - the arena players spawn into.

mod arena;
mod plugin;

pub use arena::*;
pub use plugin::WorldPlugin;
