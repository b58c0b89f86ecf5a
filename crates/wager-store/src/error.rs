//! Error types for the store layer.

use wager_protocol::{RoomId, RoomStatus, UserId};

/// Errors raised by the store and its transactions.
///
/// Only the two "not found" variants are expected in normal operation;
/// the rest mean a caller broke the locking discipline or tried an
/// illegal status change, and are treated as internal failures upstream.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No room with this id exists.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// No account with this id exists.
    #[error("account {0} not found")]
    AccountNotFound(UserId),

    /// A balance was read or written without holding the account lock.
    #[error("account {0} is not locked by this transaction")]
    AccountNotLocked(UserId),

    /// Account locks were requested after some were already held, which
    /// could acquire them out of ascending order.
    #[error("account locks already held by this transaction")]
    LockOrder,

    /// Applying an amount would take a balance past the `i64` range.
    #[error("balance of account {0} would overflow")]
    BalanceOverflow(UserId),

    /// A status change that the room lifecycle forbids.
    #[error("room {room} cannot move from {from} to {to}")]
    IllegalTransition {
        room: RoomId,
        from: RoomStatus,
        to: RoomStatus,
    },
}
