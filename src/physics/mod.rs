//! Physics module - collision layers and scene traces over Rapier.

mod trace;

pub use trace::*;
