//! The store: row tables plus the append-only ledger log.
//!
//! # Concurrency note
//!
//! Each room and each account is its own row behind its own
//! `tokio::sync::Mutex`, so operations on different rooms never contend.
//! The id → row indices and the ledger log sit behind `parking_lot`
//! locks that are only ever held for a map lookup or a push, never
//! across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::Mutex;
use wager_protocol::{RoomId, UserId};

use crate::txn::{AccountTxn, PendingEntry, RoomTxn};
use crate::{Account, LedgerEntry, Room, StoreError};

/// Transactional access to rooms, accounts, and the ledger.
///
/// Mutations go through [`lock_room`](Self::lock_room) or
/// [`lock_account`](Self::lock_account); the plain getters return
/// committed snapshots.
#[derive(Default)]
pub struct Store {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>,
    accounts: RwLock<HashMap<UserId, Arc<Mutex<Account>>>>,
    log: SyncMutex<Vec<LedgerEntry>>,
    next_room_id: AtomicU64,
    next_user_id: AtomicU64,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Accounts ----------------------------------------------------------

    /// Opens a new account with a starting balance and returns its id.
    ///
    /// Stands in for the external account service: the engine only ever
    /// needs an id and a mutable balance.
    pub fn open_account(&self, balance: i64) -> UserId {
        let id = UserId(self.next_user_id.fetch_add(1, Ordering::Relaxed) + 1);
        let row = Arc::new(Mutex::new(Account { id, balance }));
        self.accounts.write().insert(id, row);
        tracing::debug!(user_id = %id, balance, "account opened");
        id
    }

    /// Returns the committed state of an account.
    pub async fn account(&self, id: UserId) -> Result<Account, StoreError> {
        let row = self.account_row(id)?;
        let account = row.lock().await.clone();
        Ok(account)
    }

    /// Returns the committed balance of an account.
    pub async fn balance(&self, id: UserId) -> Result<i64, StoreError> {
        Ok(self.account(id).await?.balance)
    }

    /// Locks a single account outside any room. Used for adjustments.
    pub async fn lock_account(&self, id: UserId) -> Result<AccountTxn<'_>, StoreError> {
        let row = self.account_row(id)?;
        Ok(AccountTxn::new(self, row.lock_owned().await))
    }

    pub(crate) fn account_row(&self, id: UserId) -> Result<Arc<Mutex<Account>>, StoreError> {
        self.accounts
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    // -- Rooms -------------------------------------------------------------

    /// Inserts a new open room owned by `owner`.
    pub fn insert_room(&self, bet_amount: i64, owner: UserId) -> Result<Room, StoreError> {
        self.account_row(owner)?;
        let id = RoomId(self.next_room_id.fetch_add(1, Ordering::Relaxed) + 1);
        let room = Room::open(id, bet_amount, owner);
        self.rooms
            .write()
            .insert(id, Arc::new(Mutex::new(room.clone())));
        Ok(room)
    }

    /// Returns the committed state of a room.
    ///
    /// Waits for any in-flight transaction on the room, so the result is
    /// never a half-applied mix of two operations.
    pub async fn room(&self, id: RoomId) -> Result<Room, StoreError> {
        let row = self.room_row(id)?;
        let room = row.lock().await.clone();
        Ok(room)
    }

    /// Opens a transaction holding the exclusive lock on one room.
    ///
    /// Everything done through the returned [`RoomTxn`] is invisible to
    /// other callers until [`RoomTxn::commit`]; dropping it without
    /// committing discards every change.
    pub async fn lock_room(&self, id: RoomId) -> Result<RoomTxn<'_>, StoreError> {
        let row = self.room_row(id)?;
        Ok(RoomTxn::new(self, row.lock_owned().await))
    }

    fn room_row(&self, id: RoomId) -> Result<Arc<Mutex<Room>>, StoreError> {
        self.rooms
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::RoomNotFound(id))
    }

    // -- Ledger ------------------------------------------------------------

    /// All entries for one user, oldest first.
    pub fn entries_for_user(&self, user: UserId) -> Vec<LedgerEntry> {
        self.log
            .lock()
            .iter()
            .filter(|e| e.user_id == user)
            .cloned()
            .collect()
    }

    /// All entries tied to one room, oldest first.
    pub fn entries_for_room(&self, room: RoomId) -> Vec<LedgerEntry> {
        self.log
            .lock()
            .iter()
            .filter(|e| e.room_id == Some(room))
            .cloned()
            .collect()
    }

    /// Appends staged entries to the log, assigning ids and timestamps.
    ///
    /// Called only from a commit, while the affected account rows are
    /// still locked, so log order matches balance order per account.
    pub(crate) fn append(&self, pending: Vec<PendingEntry>) -> Vec<LedgerEntry> {
        if pending.is_empty() {
            return Vec::new();
        }
        let now = Utc::now();
        let mut log = self.log.lock();
        let mut written = Vec::with_capacity(pending.len());
        for entry in pending {
            let entry = LedgerEntry {
                id: log.len() as u64 + 1,
                user_id: entry.user_id,
                room_id: entry.room_id,
                kind: entry.kind,
                amount: entry.amount,
                balance_after: entry.balance_after,
                note: entry.note,
                created_at: now,
            };
            log.push(entry.clone());
            written.push(entry);
        }
        written
    }
}
