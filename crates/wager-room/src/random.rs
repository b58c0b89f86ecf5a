//! Injected randomness for secret numbers and the first-turn coin flip.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wager_protocol::UserId;

/// Source of the two random choices a game makes at start.
pub trait RandomSource: Send + Sync {
    /// A uniformly random secret number in `1..=100`.
    fn secret_number(&self) -> u8;

    /// A uniformly random choice between the two seated players.
    fn pick_first(&self, players: [UserId; 2]) -> UserId;
}

/// A [`RandomSource`] backed by a seedable `StdRng`.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// A reproducible source: the same seed yields the same games.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// A source seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl RandomSource for SeededRandom {
    fn secret_number(&self) -> u8 {
        self.rng.lock().random_range(1..=100)
    }

    fn pick_first(&self, players: [UserId; 2]) -> UserId {
        if self.rng.lock().random_bool(0.5) {
            players[0]
        } else {
            players[1]
        }
    }
}

/// A [`RandomSource`] that always makes the same choices.
///
/// `first` is used as the opening player when it is seated; otherwise
/// the first seat opens.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    pub secret: u8,
    pub first: Option<UserId>,
}

impl FixedRandom {
    pub fn new(secret: u8, first: UserId) -> Self {
        Self {
            secret,
            first: Some(first),
        }
    }
}

impl RandomSource for FixedRandom {
    fn secret_number(&self) -> u8 {
        self.secret
    }

    fn pick_first(&self, players: [UserId; 2]) -> UserId {
        match self.first {
            Some(first) if players.contains(&first) => first,
            _ => players[0],
        }
    }
}
