//! Wire protocol for wager rooms.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`RoomSnapshot`], [`ServerMessage`], [`GameEvent`],
//!   [`CloseReason`], etc.): what travels on the wire.
//! - **Inbound** ([`ClientMessage`]): the one message clients send, and
//!   how malformed frames are classified.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages are
//!   converted to/from bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (messages) → Room engine (rules, ledger)
//! ```

mod codec;
mod error;
mod inbound;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use inbound::{ClientMessage, InboundError};
pub use types::{
    CloseReason, ErrorCode, GameEvent, Hint, RoomId, RoomSnapshot, RoomStatus, ServerMessage,
    UserId,
};
