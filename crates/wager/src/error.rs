//! Unified error type for the wager server.

use wager_protocol::ProtocolError;
use wager_room::RoomError;
use wager_session::SessionError;
use wager_store::StoreError;
use wager_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WagerError {
    /// A transport-level error (accept, send, recv, close).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An authentication error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A store error that escaped the room engine.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A room engine error (rejection or internal failure).
    #[error(transparent)]
    Room(#[from] RoomError),
}
