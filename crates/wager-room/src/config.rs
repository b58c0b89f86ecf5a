//! Bet limits applied when a room is created.

use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Allowed wager amounts for new rooms.
///
/// A bet is valid when it lies in `min_bet..=max_bet` and sits on the
/// grid `min_bet, min_bet + step, min_bet + 2 * step, ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetLimits {
    pub min_bet: i64,
    pub max_bet: i64,
    pub step: i64,
}

impl Default for BetLimits {
    fn default() -> Self {
        Self {
            min_bet: 10,
            max_bet: 1000,
            step: 10,
        }
    }
}

impl BetLimits {
    /// Checks `bet` against the limits.
    pub fn validate(&self, bet: i64) -> Result<(), RoomError> {
        if bet < self.min_bet || bet > self.max_bet {
            return Err(RoomError::InvalidBet(format!(
                "bet must be between {} and {}",
                self.min_bet, self.max_bet
            )));
        }
        if self.step > 0 && (bet - self.min_bet) % self.step != 0 {
            return Err(RoomError::InvalidBet(format!(
                "bet must be {} plus a multiple of {}",
                self.min_bet, self.step
            )));
        }
        Ok(())
    }
}
