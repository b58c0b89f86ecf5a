//! Persistence for wager rooms.
//!
//! Holds the three record types the engine mutates and the one primitive
//! every mutation goes through: a transaction that owns the exclusive
//! lock on a room row (and, when balances move, the seated players'
//! account rows) for the whole read-modify-write.
//!
//! # Key types
//!
//! - [`Store`]: row tables and the append-only ledger log
//! - [`RoomTxn`]: room lock, then account locks in ascending id order;
//!   commit or drop to roll back
//! - [`AccountTxn`]: single-account lock for adjustments
//! - [`Room`], [`Account`], [`LedgerEntry`]: the records

mod error;
mod record;
mod store;
mod txn;

pub use error::StoreError;
pub use record::{Account, EntryKind, LedgerEntry, Room};
pub use store::Store;
pub use txn::{AccountTxn, RoomTxn};
