//! Error types for the room engine.

use wager_protocol::{ErrorCode, RoomId, UserId};
use wager_store::StoreError;

/// Errors that can occur during room operations.
///
/// Every variant except [`Internal`](Self::Internal) is a rejection: the
/// enclosing transaction was rolled back and nothing changed.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The user occupies neither seat.
    #[error("user {0} is not a participant in room {1}")]
    NotParticipant(UserId, RoomId),

    /// The game already ended.
    #[error("game already finished")]
    RoomFinished(RoomId),

    /// The second seat is still empty.
    #[error("waiting for second player")]
    WaitingForSecondPlayer(RoomId),

    /// A seated player guessed out of turn.
    #[error("not your turn")]
    NotYourTurn(UserId),

    /// A balance is below the amount it would be debited by.
    #[error("insufficient funds for {user}: balance {balance}, required {required}")]
    InsufficientFunds {
        user: UserId,
        balance: i64,
        required: i64,
    },

    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The creator tried to join their own room.
    #[error("cannot join your own room")]
    OwnRoom(RoomId),

    /// The wager amount is not allowed.
    #[error("invalid bet: {0}")]
    InvalidBet(String),

    /// A broken invariant or store failure. Not the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// The stable wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::NotParticipant(..) => ErrorCode::NotParticipant,
            Self::RoomFinished(_) => ErrorCode::RoomFinished,
            Self::WaitingForSecondPlayer(_) => ErrorCode::WaitingForSecondPlayer,
            Self::NotYourTurn(_) => ErrorCode::NotYourTurn,
            Self::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::OwnRoom(_) => ErrorCode::OwnRoom,
            Self::InvalidBet(_) => ErrorCode::InvalidBet,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Returns `true` for failures that should end a live connection.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<StoreError> for RoomError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(id) => Self::RoomNotFound(id),
            other => Self::Internal(other.to_string()),
        }
    }
}
