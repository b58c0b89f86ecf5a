//! Balance movements for a game: the bet lock at start and the payout at
//! the end, plus manual adjustments outside any game.
//!
//! The room-scoped operations run inside a [`RoomTxn`] the caller already
//! holds, so the balance change and the room change commit together or
//! not at all.

use chrono::{DateTime, Utc};
use wager_protocol::{GameEvent, RoomStatus, UserId};
use wager_store::{EntryKind, LedgerEntry, Room, RoomTxn, Store, StoreError};

use crate::RoomError;

/// The recorded result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishOutcome {
    pub winner: UserId,
    pub number: i64,
    pub turn_count: u32,
    pub finished_at: DateTime<Utc>,
}

impl FinishOutcome {
    /// Reads the outcome back from a finished room.
    pub fn from_room(room: &Room) -> Result<Self, RoomError> {
        match (room.winner_id, room.secret_number, room.finished_at) {
            (Some(winner), Some(number), Some(finished_at)) => Ok(Self {
                winner,
                number: i64::from(number),
                turn_count: room.turn_count,
                finished_at,
            }),
            _ => Err(RoomError::Internal(format!(
                "room {} is finished without a recorded outcome",
                room.id
            ))),
        }
    }

    /// The `GAME_OVER` event announcing this outcome.
    pub fn event(&self) -> GameEvent {
        GameEvent::GameOver {
            winner: self.winner,
            number: self.number,
            turn_count: self.turn_count,
            finished_at: self.finished_at,
        }
    }
}

/// Debits the wager from both seated players.
///
/// Both balances are checked before either is touched. Must run at most
/// once per room; the `is_locked` gate in the state machine makes sure of
/// that.
pub(crate) async fn lock_bets(txn: &mut RoomTxn<'_>) -> Result<(), RoomError> {
    let room_id = txn.room().id;
    let players = txn
        .room()
        .seated()
        .ok_or(RoomError::WaitingForSecondPlayer(room_id))?;
    let bet = txn.room().bet_amount;

    txn.lock_accounts().await?;
    for user in players {
        let balance = txn.balance(user)?;
        if balance < bet {
            tracing::debug!(%room_id, %user, balance, bet, "bet lock refused");
            return Err(RoomError::InsufficientFunds {
                user,
                balance,
                required: bet,
            });
        }
    }

    for user in players {
        txn.post(user, EntryKind::BetLock, -bet, format!("bet lock for room {room_id}"))?;
    }
    tracing::info!(%room_id, bet, "bets locked");
    Ok(())
}

/// Finishes the room with `winner` and credits them twice the wager.
///
/// Idempotent: on a room that is already finished, returns the recorded
/// outcome and moves no money.
pub(crate) async fn finish_and_payout(
    txn: &mut RoomTxn<'_>,
    winner: UserId,
) -> Result<FinishOutcome, RoomError> {
    let room = txn.room();
    let room_id = room.id;
    if room.status.is_finished() {
        return FinishOutcome::from_room(room);
    }
    if !room.is_locked {
        return Err(RoomError::WaitingForSecondPlayer(room_id));
    }
    if !room.is_participant(winner) {
        return Err(RoomError::NotParticipant(winner, room_id));
    }
    let pot = room
        .bet_amount
        .checked_mul(2)
        .ok_or_else(|| RoomError::Internal(format!("pot of room {room_id} overflows")))?;

    txn.lock_accounts().await?;
    let balance = txn.post(winner, EntryKind::Payout, pot, format!("payout for room {room_id}"))?;

    let room = txn.room_mut();
    room.transition(RoomStatus::Finished)?;
    room.winner_id = Some(winner);
    room.finished_at = Some(Utc::now());
    room.turn_count += 1;

    let outcome = FinishOutcome::from_room(room)?;
    tracing::info!(
        %room_id,
        %winner,
        pot,
        balance,
        turn_count = outcome.turn_count,
        "game finished"
    );
    Ok(outcome)
}

/// Applies a manual balance correction and records an `adjust` entry.
///
/// Refused with [`RoomError::InsufficientFunds`] if the balance would go
/// negative, and with [`RoomError::Internal`] if it would overflow.
pub(crate) async fn adjust(
    store: &Store,
    user: UserId,
    delta: i64,
    note: &str,
) -> Result<LedgerEntry, RoomError> {
    let mut txn = store.lock_account(user).await?;
    let balance = txn.account().balance;
    let after = balance
        .checked_add(delta)
        .ok_or(StoreError::BalanceOverflow(user))?;
    if after < 0 {
        return Err(RoomError::InsufficientFunds {
            user,
            balance,
            required: delta.saturating_neg(),
        });
    }
    txn.post(EntryKind::Adjust, delta, note)?;
    let mut written = txn.commit();
    tracing::info!(%user, delta, "balance adjusted");
    written
        .pop()
        .ok_or_else(|| RoomError::Internal("adjustment wrote no entry".into()))
}
