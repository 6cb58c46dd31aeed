//! Error types for appearance loading.

use thiserror::Error;

use crate::net::PeerId;

/// Errors that can occur when reading a peer's clothing.
#[derive(Debug, Error)]
pub enum AppearanceError {
    /// The peer is not (or no longer) connected.
    #[error("No connection for {0}")]
    UnknownPeer(PeerId),

    /// The peer published no avatar.
    #[error("{0} has no avatar user data")]
    MissingUserData(PeerId),

    /// The avatar blob is not a clothing container.
    #[error("Malformed avatar: {details}")]
    Parse { details: String },
}
