//! Guess validation and turn progression.

use wager_protocol::{GameEvent, Hint, RoomId, RoomStatus, UserId};

use crate::ledger::finish_and_payout;
use crate::machine::initialize;
use crate::{RoomError, RoomManager};

/// The events produced by one accepted guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    /// `ROOM_STARTED`, when the guess found the room full but not yet
    /// started and started it first.
    pub started: Option<GameEvent>,
    /// `GUESS` for a miss, `GAME_OVER` for a hit.
    pub event: GameEvent,
}

impl GuessOutcome {
    /// All events in the order subscribers should see them.
    pub fn events(&self) -> impl Iterator<Item = &GameEvent> {
        self.started.iter().chain(std::iter::once(&self.event))
    }
}

impl RoomManager {
    /// Applies `value` as `user`'s guess in `room_id`.
    ///
    /// Checks run under the room lock in a fixed order (status, seat,
    /// turn) and any rejection leaves the room and balances untouched.
    /// A hit finishes the game and pays the guesser; a miss passes the
    /// turn and counts it.
    pub async fn apply_guess(
        &self,
        room_id: RoomId,
        user: UserId,
        value: i64,
    ) -> Result<GuessOutcome, RoomError> {
        let mut txn = self.store.lock_room(room_id).await?;

        match txn.room().status {
            RoomStatus::Open => return Err(RoomError::WaitingForSecondPlayer(room_id)),
            RoomStatus::Finished => return Err(RoomError::RoomFinished(room_id)),
            RoomStatus::Full => {}
        }
        if !txn.room().is_participant(user) {
            return Err(RoomError::NotParticipant(user, room_id));
        }

        let mut started = None;
        if !txn.room().is_locked && initialize(&mut txn, self.random.as_ref()).await? {
            let room = txn.room();
            if let Some(turn) = room.current_turn_id {
                started = Some(GameEvent::RoomStarted {
                    turn,
                    turn_count: room.turn_count,
                });
            }
        }

        let room = txn.room();
        if room.current_turn_id != Some(user) {
            tracing::debug!(%room_id, %user, "guess out of turn");
            return Err(RoomError::NotYourTurn(user));
        }
        let secret = room
            .secret_number
            .map(i64::from)
            .ok_or_else(|| RoomError::Internal(format!("room {room_id} has no secret number")))?;

        let event = if value == secret {
            finish_and_payout(&mut txn, user).await?.event()
        } else {
            let next = room
                .opponent_of(user)
                .ok_or_else(|| RoomError::Internal(format!("room {room_id} has one seat")))?;
            let room = txn.room_mut();
            room.turn_count += 1;
            room.current_turn_id = Some(next);
            GameEvent::Guess {
                by: user,
                value,
                hint: Hint::for_guess(secret, value),
                next_turn: next,
                turn_count: room.turn_count,
            }
        };
        txn.commit();

        tracing::debug!(%room_id, %user, value, "guess applied");
        Ok(GuessOutcome { started, event })
    }
}
