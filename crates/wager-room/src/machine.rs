//! Room lifecycle: `open → full → finished`, and game initialization.

use chrono::Utc;
use wager_protocol::{GameEvent, RoomId, RoomSnapshot, RoomStatus};
use wager_store::RoomTxn;

use crate::ledger::lock_bets;
use crate::{RandomSource, RoomError, RoomManager};

/// What [`RoomManager::initialize_if_ready`] saw and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initialized {
    /// The room as committed by the call.
    pub snapshot: RoomSnapshot,
    /// `true` only for the one call that locked the bets.
    pub started: bool,
}

impl Initialized {
    /// The `ROOM_STARTED` event, if this call started the game.
    pub fn started_event(&self) -> Option<GameEvent> {
        if !self.started {
            return None;
        }
        Some(GameEvent::RoomStarted {
            turn: self.snapshot.turn?,
            turn_count: self.snapshot.turn_count,
        })
    }
}

/// Starts the game in the locked room if both seats are taken.
///
/// Returns `true` if this call locked the bets. The `is_locked` flag on
/// the row is the only idempotency gate; callers never track it
/// themselves. Never touches the seats: a join that seated a player and
/// then hits `InsufficientFunds` here rolls back by dropping `txn`.
pub(crate) async fn initialize(
    txn: &mut RoomTxn<'_>,
    random: &dyn RandomSource,
) -> Result<bool, RoomError> {
    let Some(players) = txn.room().seated() else {
        return Ok(false);
    };
    if txn.room().status.is_finished() {
        return Ok(false);
    }
    if txn.room().status != RoomStatus::Full {
        txn.room_mut().transition(RoomStatus::Full)?;
    }
    if txn.room().is_locked {
        return Ok(false);
    }

    let room = txn.room_mut();
    if room.secret_number.is_none() {
        room.secret_number = Some(random.secret_number());
    }
    if room.current_turn_id.is_none() {
        room.current_turn_id = Some(random.pick_first(players));
    }

    lock_bets(txn).await?;

    let room = txn.room_mut();
    room.is_locked = true;
    room.started_at.get_or_insert_with(Utc::now);
    Ok(true)
}

impl RoomManager {
    /// Starts the game if the room is full and not yet started.
    ///
    /// Safe to call any number of times from any number of tasks: exactly
    /// one call ever locks the bets, and every call returns the committed
    /// snapshot.
    pub async fn initialize_if_ready(&self, room_id: RoomId) -> Result<Initialized, RoomError> {
        let mut txn = self.store.lock_room(room_id).await?;
        let started = initialize(&mut txn, self.random.as_ref()).await?;
        let snapshot = txn.room().snapshot();
        txn.commit();

        if started {
            tracing::info!(%room_id, turn = ?snapshot.turn, "game started");
        }
        Ok(Initialized { snapshot, started })
    }
}
