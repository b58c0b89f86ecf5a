//! The room game engine for wager.
//!
//! Two players, one secret number, one pot. Every mutation runs inside a
//! locked room transaction from `wager-store`, so a join racing a live
//! connection, or two guesses racing each other, always serialize.
//!
//! # Key types
//!
//! - [`RoomManager`]: create/join rooms, start games, apply guesses
//! - [`Initialized`]: result of the idempotent game start
//! - [`GuessOutcome`]: events produced by an accepted guess
//! - [`FinishOutcome`]: the recorded result of a finished game
//! - [`RandomSource`]: injected randomness ([`SeededRandom`], [`FixedRandom`])
//! - [`BetLimits`]: allowed wager amounts

mod config;
mod error;
mod ledger;
mod machine;
mod manager;
mod random;
mod turn;

pub use config::BetLimits;
pub use error::RoomError;
pub use ledger::FinishOutcome;
pub use machine::Initialized;
pub use manager::RoomManager;
pub use random::{FixedRandom, RandomSource, SeededRandom};
pub use turn::GuessOutcome;
