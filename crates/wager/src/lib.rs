//! # Wager
//!
//! Real-time server for two-player number-guessing rooms with a wager.
//!
//! Clients attach to a room over WebSocket at
//! `ws://host/ws/rooms/<room_id>/?token=<token>`, receive a snapshot of
//! the room, and send `GUESS` messages in turn. The first correct guess
//! wins the pot; every move is broadcast to both players.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wager::prelude::*;
//!
//! # async fn run() -> Result<(), WagerError> {
//! let store = Arc::new(Store::new());
//! let alice = store.open_account(1000);
//! let tokens = TokenRegistry::new();
//! let token = tokens.issue(alice).await;
//!
//! let server = WagerServer::<TokenRegistry, wager_protocol::JsonCodec>::builder()
//!     .bind("0.0.0.0:8080")
//!     .store(store)
//!     .build(tokens)
//!     .await?;
//! let room = server.handle().create_room(100, alice).await?;
//! println!("ws://localhost:8080/ws/rooms/{}/?token={token}", room.id.0);
//! server.run().await
//! # }
//! ```

mod broadcast;
mod error;
mod handler;
mod route;
mod server;

pub use broadcast::{Broadcaster, Subscription};
pub use error::WagerError;
pub use server::{GameHandle, WagerServer, WagerServerBuilder};

/// Everything needed to run a server and talk to it.
pub mod prelude {
    pub use crate::{GameHandle, WagerError, WagerServer, WagerServerBuilder};
    pub use wager_protocol::{
        ClientMessage, CloseReason, ErrorCode, GameEvent, Hint, RoomId, RoomSnapshot, RoomStatus,
        ServerMessage, UserId,
    };
    pub use wager_room::{
        BetLimits, FixedRandom, GuessOutcome, Initialized, RandomSource, RoomError, RoomManager,
        SeededRandom,
    };
    pub use wager_session::{Authenticator, SessionError, TokenRegistry};
    pub use wager_store::{EntryKind, LedgerEntry, Room, Store};
}
