//! Net module - session state, broadcast messages, and player spawning.
//!
//! Transport is not part of this crate. Outgoing broadcasts are queued in
//! [`Outbox`] for a transport to drain, and messages it receives are pushed
//! into [`Inbox`]. Every broadcast is also replayed locally, so the sending
//! peer and its remote proxies apply the same state.

mod bootstrap;
mod broadcast;
mod messages;
mod plugin;
mod session;

pub use bootstrap::*;
pub use broadcast::*;
pub use messages::*;
pub use plugin::NetPlugin;
pub use session::*;
