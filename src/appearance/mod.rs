//! Appearance module - dress players in their owner's clothing on spawn.

mod clothing;
mod error;
mod plugin;

pub use clothing::*;
pub use error::AppearanceError;
pub use plugin::AppearancePlugin;
