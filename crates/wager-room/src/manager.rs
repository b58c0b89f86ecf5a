//! Room manager: the entry point the server and the account side use to
//! create, join, and inspect rooms.

use std::sync::Arc;

use wager_protocol::{RoomId, RoomSnapshot, UserId};
use wager_store::{LedgerEntry, Room, Store};

use crate::ledger::{self, FinishOutcome};
use crate::machine::{Initialized, initialize};
use crate::{BetLimits, RandomSource, RoomError};

/// The largest bet whose pot still fits in an `i64`.
const MAX_BET: i64 = i64::MAX / 2;

/// Owns the store handle, the random source, and the bet limits.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and does
/// its own per-room locking, so calls on different rooms run in parallel.
pub struct RoomManager {
    pub(crate) store: Arc<Store>,
    pub(crate) random: Arc<dyn RandomSource>,
    bet_limits: Option<BetLimits>,
}

impl RoomManager {
    /// Creates a manager with default bet limits.
    pub fn new(store: Arc<Store>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            store,
            random,
            bet_limits: Some(BetLimits::default()),
        }
    }

    /// Replaces the bet limits. `None` accepts any positive bet up to
    /// half of `i64::MAX`.
    pub fn with_bet_limits(mut self, limits: Option<BetLimits>) -> Self {
        self.bet_limits = limits;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Creates an open room with `owner` in the first seat.
    ///
    /// The owner must be able to cover the bet now, though nothing is
    /// debited until the game starts.
    pub async fn create_room(&self, bet_amount: i64, owner: UserId) -> Result<Room, RoomError> {
        if bet_amount <= 0 {
            return Err(RoomError::InvalidBet("bet must be positive".into()));
        }
        if bet_amount > MAX_BET {
            return Err(RoomError::InvalidBet(format!("bet must not exceed {MAX_BET}")));
        }
        if let Some(limits) = &self.bet_limits {
            limits.validate(bet_amount)?;
        }
        let balance = self.store.balance(owner).await?;
        if balance < bet_amount {
            return Err(RoomError::InsufficientFunds {
                user: owner,
                balance,
                required: bet_amount,
            });
        }

        let room = self.store.insert_room(bet_amount, owner)?;
        tracing::info!(room_id = %room.id, %owner, bet_amount, "room created");
        Ok(room)
    }

    /// Seats `user` as the second player and starts the game.
    ///
    /// Seating and initialization share one transaction: if either
    /// player cannot cover the bet, the seat is given back and the room
    /// stays open.
    pub async fn join_room(&self, room_id: RoomId, user: UserId) -> Result<Initialized, RoomError> {
        let mut txn = self.store.lock_room(room_id).await?;
        let room = txn.room();
        if room.status.is_finished() {
            return Err(RoomError::RoomFinished(room_id));
        }
        if room.player1_id == user {
            return Err(RoomError::OwnRoom(room_id));
        }
        if room.player2_id.is_some() || !room.status.is_joinable() {
            return Err(RoomError::RoomFull(room_id));
        }

        txn.room_mut().player2_id = Some(user);
        let started = initialize(&mut txn, self.random.as_ref()).await?;
        let snapshot = txn.room().snapshot();
        txn.commit();

        tracing::info!(%room_id, %user, started, "player joined");
        Ok(Initialized { snapshot, started })
    }

    /// The committed client-visible state of a room.
    pub async fn snapshot(&self, room_id: RoomId) -> Result<RoomSnapshot, RoomError> {
        Ok(self.store.room(room_id).await?.snapshot())
    }

    /// The committed room record, secret number included.
    pub async fn room(&self, room_id: RoomId) -> Result<Room, RoomError> {
        Ok(self.store.room(room_id).await?)
    }

    /// A user's committed balance.
    pub async fn balance(&self, user: UserId) -> Result<i64, RoomError> {
        Ok(self.store.balance(user).await?)
    }

    /// Applies a manual balance correction outside any game.
    pub async fn adjust_balance(
        &self,
        user: UserId,
        delta: i64,
        note: &str,
    ) -> Result<LedgerEntry, RoomError> {
        ledger::adjust(&self.store, user, delta, note).await
    }

    /// Finishes the room with `winner` and pays them the pot.
    ///
    /// Calling it again on the finished room returns the same outcome
    /// and moves no money.
    pub async fn finish_and_payout(
        &self,
        room_id: RoomId,
        winner: UserId,
    ) -> Result<FinishOutcome, RoomError> {
        let mut txn = self.store.lock_room(room_id).await?;
        let outcome = ledger::finish_and_payout(&mut txn, winner).await?;
        txn.commit();
        Ok(outcome)
    }

    /// A user's ledger history, oldest first.
    pub fn user_entries(&self, user: UserId) -> Vec<LedgerEntry> {
        self.store.entries_for_user(user)
    }

    /// Every ledger entry tied to a room, oldest first.
    pub fn room_entries(&self, room_id: RoomId) -> Vec<LedgerEntry> {
        self.store.entries_for_room(room_id)
    }
}
