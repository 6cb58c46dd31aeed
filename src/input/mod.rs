//! Input module - named actions sampled from the keyboard and mouse.

mod actions;

pub use actions::*;
