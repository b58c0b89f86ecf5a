//! Persisted records: rooms, accounts, and ledger entries.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use wager_protocol::{RoomId, RoomSnapshot, RoomStatus, UserId};

use crate::StoreError;

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game session between two players with a fixed wager.
///
/// Invariants kept by the engine (never by callers poking at fields):
/// - `finished_at` and `winner_id` are set iff `status == Finished`
/// - `is_locked` implies `secret_number` and `current_turn_id` are set
/// - `status == Open` implies `player2_id` is unset
/// - `is_locked` only ever goes false → true
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub bet_amount: i64,
    pub status: RoomStatus,
    pub player1_id: UserId,
    pub player2_id: Option<UserId>,
    pub secret_number: Option<u8>,
    pub current_turn_id: Option<UserId>,
    pub winner_id: Option<UserId>,
    pub is_locked: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub turn_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// A freshly created, open room with `owner` in the first seat.
    pub fn open(id: RoomId, bet_amount: i64, owner: UserId) -> Self {
        Self {
            id,
            bet_amount,
            status: RoomStatus::Open,
            player1_id: owner,
            player2_id: None,
            secret_number: None,
            current_turn_id: None,
            winner_id: None,
            is_locked: false,
            started_at: None,
            finished_at: None,
            turn_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Both seated players in seat order, once the second seat is taken.
    pub fn seated(&self) -> Option<[UserId; 2]> {
        self.player2_id.map(|p2| [self.player1_id, p2])
    }

    /// Returns `true` if `user` occupies either seat.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.player1_id == user || self.player2_id == Some(user)
    }

    /// The other seated player, if `user` is seated and the room is full.
    pub fn opponent_of(&self, user: UserId) -> Option<UserId> {
        let [p1, p2] = self.seated()?;
        if user == p1 {
            Some(p2)
        } else if user == p2 {
            Some(p1)
        } else {
            None
        }
    }

    /// Moves the room to `to`, refusing anything but the next state.
    pub fn transition(&mut self, to: RoomStatus) -> Result<(), StoreError> {
        if !self.status.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                room: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// How long the game ran, once it has both started and finished.
    pub fn duration(&self) -> Option<Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    /// The client-visible view. Never includes the secret number.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room: self.id,
            status: self.status,
            bet_amount: self.bet_amount,
            players: (self.player1_id, self.player2_id),
            turn: self.current_turn_id,
            winner: self.winner_id,
            finished_at: self.finished_at,
            turn_count: self.turn_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The slice of a user account the engine mutates.
///
/// `balance >= 0` is not enforced here; every debit checks it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub balance: i64,
}

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// What kind of balance movement an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// The one-time wager debit at game start.
    BetLock,
    /// The one-time credit of twice the wager to the winner.
    Payout,
    /// A manual correction outside any game.
    Adjust,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BetLock => write!(f, "bet_lock"),
            Self::Payout => write!(f, "payout"),
            Self::Adjust => write!(f, "adjust"),
        }
    }
}

/// Immutable record of one balance-affecting event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub user_id: UserId,
    pub room_id: Option<RoomId>,
    pub kind: EntryKind,
    /// Signed: debits are negative.
    pub amount: i64,
    /// The account balance right after this entry was applied.
    pub balance_after: i64,
    pub note: String,
    pub created_at: DateTime<Utc>,
}
