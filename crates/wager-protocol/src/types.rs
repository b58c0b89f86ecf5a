//! Core protocol types for the wager wire format.
//!
//! Everything in this module travels "on the wire": identities, the room
//! snapshot clients render, the single client message (`GUESS`), and the
//! four server messages (`SNAPSHOT`, `INFO`, `ERROR`, `GAME_EVENT`).
//!
//! The secret number never appears here. The snapshot is the externally
//! visible subset of a room, nothing more.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user account.
///
/// Newtype wrapper around `u64` so a `RoomId` can never be passed where a
/// `UserId` is expected. `#[serde(transparent)]` keeps the JSON a plain
/// number: `UserId(42)` becomes `42`, not `{"0": 42}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for a room (one game between two players).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are strictly forward:
///
/// ```text
/// Open → Full → Finished
/// ```
///
/// - **Open**: the creator is seated, waiting for a second player.
/// - **Full**: both seats taken. Once bets are locked, guesses are accepted.
/// - **Finished**: someone guessed the number and the pot was paid out.
///   Terminal; the room stays around as history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Open,
    Full,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if a second player may still take the empty seat.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` once the room has reached its terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns the next state in the lifecycle, or `None` when terminal.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Open => Some(Self::Full),
            Self::Full => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if moving from `self` to `target` is legal.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Full => write!(f, "full"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomSnapshot
// ---------------------------------------------------------------------------

/// The client-visible view of a room.
///
/// `players` is an ordered pair: the creator first, the joiner second
/// (`null` while the room is open). Serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: RoomId,
    pub status: RoomStatus,
    pub bet_amount: i64,
    pub players: (UserId, Option<UserId>),
    pub turn: Option<UserId>,
    pub winner: Option<UserId>,
    pub finished_at: Option<DateTime<Utc>>,
    pub turn_count: u32,
}

// ---------------------------------------------------------------------------
// Game events
// ---------------------------------------------------------------------------

/// Whether the secret number lies above or below a missed guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hint {
    Higher,
    Lower,
}

impl Hint {
    /// Compares a guess against the secret.
    ///
    /// Only meaningful for a miss; a correct guess has no hint.
    pub fn for_guess(secret: i64, guess: i64) -> Self {
        if secret > guess { Self::Higher } else { Self::Lower }
    }
}

/// An event fanned out to every connection subscribed to a room.
///
/// Internally tagged on `event`, so a miss looks like
/// `{"event": "GUESS", "by": 2, "value": 50, "hint": "lower", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    /// Bets were locked and the first turn assigned.
    RoomStarted { turn: UserId, turn_count: u32 },

    /// A guess missed. The turn passed to `next_turn`.
    Guess {
        by: UserId,
        value: i64,
        hint: Hint,
        next_turn: UserId,
        turn_count: u32,
    },

    /// A guess hit the secret number; the pot went to `winner`.
    GameOver {
        winner: UserId,
        number: i64,
        turn_count: u32,
        finished_at: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Stable, machine-readable error codes carried in `ERROR` payloads.
///
/// Clients switch on these to tell "wait" apart from "wrong turn" apart
/// from "insufficient funds". The human-readable `detail` next to it may
/// change; the code does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AuthenticationRequired,
    NotParticipant,
    RoomNotFound,
    RoomFinished,
    WaitingForSecondPlayer,
    NotYourTurn,
    InvalidGuessValue,
    UnknownMessageType,
    InsufficientFunds,
    RoomFull,
    OwnRoom,
    InvalidBet,
    InternalError,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Messages the server sends to a connected client.
///
/// Adjacently tagged: `{"type": "SNAPSHOT", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full room state, sent to one connection on attach.
    Snapshot(RoomSnapshot),

    /// Informational notice (e.g. "Waiting for second player").
    Info { detail: String },

    /// A rejected request. The connection stays open unless the code is
    /// `internal_error`.
    Error { code: ErrorCode, detail: String },

    /// A room event, broadcast to every subscriber.
    GameEvent(GameEvent),
}

impl ServerMessage {
    pub fn info(detail: impl Into<String>) -> Self {
        Self::Info {
            detail: detail.into(),
        }
    }

    pub fn error(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Error {
            code,
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Close reasons
// ---------------------------------------------------------------------------

/// Why the server closed a connection during or after attach.
///
/// The numeric codes live in the 4000-4999 application range, except
/// `InternalError` which uses the standard 1011 ("unexpected condition").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    Unauthenticated,
    NotParticipant,
    RoomNotFound,
    InternalError,
}

impl CloseReason {
    /// The WebSocket close code sent to the client.
    pub fn code(self) -> u16 {
        match self {
            Self::Unauthenticated => 4401,
            Self::NotParticipant => 4403,
            Self::RoomNotFound => 4404,
            Self::InternalError => 1011,
        }
    }

    /// Short reason text sent alongside the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "not authenticated",
            Self::NotParticipant => "not a participant",
            Self::RoomNotFound => "room not found",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

// =========================================================================
// Tests
// =========================================================================
