//! Camera module - mouse look, head replication, and camera placement.

mod plugin;
mod rig;

pub use plugin::CameraPlugin;
pub use rig::*;
