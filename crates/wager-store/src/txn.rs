//! Locked transactions over room and account rows.
//!
//! A transaction works on private copies of the rows it has locked. On
//! [`commit`](RoomTxn::commit) the copies are written back and staged
//! ledger entries are appended, all while the locks are still held. If
//! the transaction is dropped instead (an error bubbled up with `?`),
//! the copies are discarded and nothing is visible to anyone.
//!
//! Lock order is fixed: the room row first, then the seated players'
//! account rows in ascending id order. Two rooms that share a player can
//! therefore never wait on each other in a cycle.

use std::collections::BTreeMap;

use tokio::sync::OwnedMutexGuard;
use wager_protocol::{RoomId, UserId};

use crate::{Account, EntryKind, LedgerEntry, Room, Store, StoreError};

/// A ledger entry staged inside a transaction, not yet in the log.
pub(crate) struct PendingEntry {
    pub(crate) user_id: UserId,
    pub(crate) room_id: Option<RoomId>,
    pub(crate) kind: EntryKind,
    pub(crate) amount: i64,
    pub(crate) balance_after: i64,
    pub(crate) note: String,
}

/// An account row held by a transaction, with its working copy.
struct LockedAccount {
    guard: OwnedMutexGuard<Account>,
    working: Account,
}

/// Applies `amount` to a working account and stages the matching entry.
/// The working copy is left untouched if the balance would overflow.
fn stage(
    pending: &mut Vec<PendingEntry>,
    account: &mut Account,
    room_id: Option<RoomId>,
    kind: EntryKind,
    amount: i64,
    note: String,
) -> Result<i64, StoreError> {
    account.balance = account
        .balance
        .checked_add(amount)
        .ok_or(StoreError::BalanceOverflow(account.id))?;
    pending.push(PendingEntry {
        user_id: account.id,
        room_id,
        kind,
        amount,
        balance_after: account.balance,
        note,
    });
    Ok(account.balance)
}

// ---------------------------------------------------------------------------
// RoomTxn
// ---------------------------------------------------------------------------

/// A transaction holding the exclusive lock on one room and, optionally,
/// on its seated players' accounts.
pub struct RoomTxn<'s> {
    store: &'s Store,
    guard: OwnedMutexGuard<Room>,
    room: Room,
    accounts: BTreeMap<UserId, LockedAccount>,
    pending: Vec<PendingEntry>,
}

impl<'s> RoomTxn<'s> {
    pub(crate) fn new(store: &'s Store, guard: OwnedMutexGuard<Room>) -> Self {
        let room = guard.clone();
        Self {
            store,
            guard,
            room,
            accounts: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    /// The room as this transaction currently sees it.
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Mutable access to the working copy of the room.
    pub fn room_mut(&mut self) -> &mut Room {
        &mut self.room
    }

    /// Locks the account rows of every seated player, lowest id first.
    ///
    /// Calling it again with the same seats is a no-op. Calling it after
    /// the seats changed is refused with [`StoreError::LockOrder`], since
    /// the new lock might sort before one already held.
    pub async fn lock_accounts(&mut self) -> Result<(), StoreError> {
        let mut wanted = match self.room.seated() {
            Some(players) => players.to_vec(),
            None => vec![self.room.player1_id],
        };
        wanted.sort();
        wanted.dedup();

        if !self.accounts.is_empty() {
            return if wanted.iter().all(|id| self.accounts.contains_key(id)) {
                Ok(())
            } else {
                Err(StoreError::LockOrder)
            };
        }

        for id in wanted {
            let row = self.store.account_row(id)?;
            let guard = row.lock_owned().await;
            let working = guard.clone();
            self.accounts.insert(id, LockedAccount { guard, working });
        }
        Ok(())
    }

    /// The working balance of a locked account.
    pub fn balance(&self, user: UserId) -> Result<i64, StoreError> {
        self.accounts
            .get(&user)
            .map(|a| a.working.balance)
            .ok_or(StoreError::AccountNotLocked(user))
    }

    /// Applies a signed amount to a locked account and stages a ledger
    /// entry for it, tied to this room. Returns the new balance.
    pub fn post(
        &mut self,
        user: UserId,
        kind: EntryKind,
        amount: i64,
        note: impl Into<String>,
    ) -> Result<i64, StoreError> {
        let account = self
            .accounts
            .get_mut(&user)
            .ok_or(StoreError::AccountNotLocked(user))?;
        stage(
            &mut self.pending,
            &mut account.working,
            Some(self.room.id),
            kind,
            amount,
            note.into(),
        )
    }

    /// Writes every change back and appends staged entries to the log.
    ///
    /// Returns the entries as written (with ids and timestamps).
    pub fn commit(self) -> Vec<LedgerEntry> {
        let RoomTxn {
            store,
            mut guard,
            room,
            accounts,
            pending,
        } = self;

        let room_id = room.id;
        *guard = room;
        let held: Vec<OwnedMutexGuard<Account>> = accounts
            .into_values()
            .map(|LockedAccount { mut guard, working }| {
                *guard = working;
                guard
            })
            .collect();

        let written = store.append(pending);
        tracing::debug!(%room_id, entries = written.len(), "room transaction committed");

        drop(held);
        written
    }
}

// ---------------------------------------------------------------------------
// AccountTxn
// ---------------------------------------------------------------------------

/// A transaction holding the lock on a single account, outside any room.
pub struct AccountTxn<'s> {
    store: &'s Store,
    guard: OwnedMutexGuard<Account>,
    working: Account,
    pending: Vec<PendingEntry>,
}

impl<'s> AccountTxn<'s> {
    pub(crate) fn new(store: &'s Store, guard: OwnedMutexGuard<Account>) -> Self {
        let working = guard.clone();
        Self {
            store,
            guard,
            working,
            pending: Vec::new(),
        }
    }

    /// The account as this transaction currently sees it.
    pub fn account(&self) -> &Account {
        &self.working
    }

    /// Applies a signed amount and stages an entry with no room attached.
    pub fn post(
        &mut self,
        kind: EntryKind,
        amount: i64,
        note: impl Into<String>,
    ) -> Result<i64, StoreError> {
        stage(
            &mut self.pending,
            &mut self.working,
            None,
            kind,
            amount,
            note.into(),
        )
    }

    /// Writes the balance back and appends staged entries to the log.
    pub fn commit(self) -> Vec<LedgerEntry> {
        let AccountTxn {
            store,
            mut guard,
            working,
            pending,
        } = self;
        *guard = working;
        store.append(pending)
    }
}
