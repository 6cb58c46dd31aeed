//! Core module - states, config loading, and shared systems.
//!
//! Everything else builds on the game states and config helpers defined here.

mod config;
mod plugin;
mod smoothing;
mod states;

pub use config::*;
pub use plugin::CorePlugin;
pub use smoothing::*;
pub use states::*;
