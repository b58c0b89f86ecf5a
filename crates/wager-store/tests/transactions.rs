//! Integration tests for room and account transactions.

use std::sync::Arc;

use wager_protocol::{RoomId, RoomStatus, UserId};
use wager_store::{EntryKind, Store, StoreError};

/// A store with two funded accounts and one room they both sit in.
async fn seated_room(store: &Store) -> (RoomId, UserId, UserId) {
    let p1 = store.open_account(500);
    let p2 = store.open_account(500);
    let room = store.insert_room(100, p1).unwrap();

    let mut txn = store.lock_room(room.id).await.unwrap();
    txn.room_mut().player2_id = Some(p2);
    txn.room_mut().transition(RoomStatus::Full).unwrap();
    txn.commit();

    (room.id, p1, p2)
}

#[tokio::test]
async fn test_insert_room_requires_owner_account() {
    let store = Store::new();
    let result = store.insert_room(100, UserId(99));
    assert!(matches!(result, Err(StoreError::AccountNotFound(_))));
}

#[tokio::test]
async fn test_lock_room_unknown_id() {
    let store = Store::new();
    let result = store.lock_room(RoomId(404)).await;
    assert!(matches!(result, Err(StoreError::RoomNotFound(RoomId(404)))));
}

#[tokio::test]
async fn test_commit_persists_room_and_balances() {
    let store = Store::new();
    let (room_id, p1, p2) = seated_room(&store).await;

    let mut txn = store.lock_room(room_id).await.unwrap();
    txn.lock_accounts().await.unwrap();
    let after = txn.post(p1, EntryKind::BetLock, -100, "bet").unwrap();
    assert_eq!(after, 400);
    txn.room_mut().turn_count = 5;
    let written = txn.commit();

    assert_eq!(written.len(), 1);
    assert_eq!(written[0].balance_after, 400);
    assert_eq!(written[0].room_id, Some(room_id));
    assert_eq!(store.balance(p1).await.unwrap(), 400);
    assert_eq!(store.balance(p2).await.unwrap(), 500);
    assert_eq!(store.room(room_id).await.unwrap().turn_count, 5);
}

#[tokio::test]
async fn test_dropping_txn_rolls_back_everything() {
    let store = Store::new();
    let (room_id, p1, p2) = seated_room(&store).await;

    {
        let mut txn = store.lock_room(room_id).await.unwrap();
        txn.lock_accounts().await.unwrap();
        txn.post(p1, EntryKind::BetLock, -100, "bet").unwrap();
        txn.post(p2, EntryKind::BetLock, -100, "bet").unwrap();
        txn.room_mut().is_locked = true;
        // dropped without commit
    }

    assert_eq!(store.balance(p1).await.unwrap(), 500);
    assert_eq!(store.balance(p2).await.unwrap(), 500);
    assert!(!store.room(room_id).await.unwrap().is_locked);
    assert!(store.entries_for_room(room_id).is_empty());
}

#[tokio::test]
async fn test_post_without_account_lock_is_refused() {
    let store = Store::new();
    let (room_id, p1, _) = seated_room(&store).await;

    let mut txn = store.lock_room(room_id).await.unwrap();
    let result = txn.post(p1, EntryKind::BetLock, -100, "bet");
    assert!(matches!(result, Err(StoreError::AccountNotLocked(_))));
}

#[tokio::test]
async fn test_lock_accounts_twice_is_noop_but_new_seat_is_refused() {
    let store = Store::new();
    let p1 = store.open_account(500);
    let p2 = store.open_account(500);
    let room = store.insert_room(100, p1).unwrap();

    let mut txn = store.lock_room(room.id).await.unwrap();
    txn.lock_accounts().await.unwrap();
    txn.lock_accounts().await.unwrap();

    txn.room_mut().player2_id = Some(p2);
    let result = txn.lock_accounts().await;
    assert!(matches!(result, Err(StoreError::LockOrder)));
}

#[tokio::test]
async fn test_account_txn_posts_adjustment_without_room() {
    let store = Store::new();
    let user = store.open_account(10);

    let mut txn = store.lock_account(user).await.unwrap();
    assert_eq!(txn.post(EntryKind::Adjust, 40, "top-up").unwrap(), 50);
    let written = txn.commit();

    assert_eq!(written[0].room_id, None);
    assert_eq!(written[0].kind, EntryKind::Adjust);
    assert_eq!(store.balance(user).await.unwrap(), 50);
    assert_eq!(store.entries_for_user(user).len(), 1);
}

#[tokio::test]
async fn test_overflowing_post_is_refused_and_leaves_balance() {
    let store = Store::new();
    let p1 = store.open_account(i64::MAX - 5);
    let p2 = store.open_account(100);
    let room = store.insert_room(10, p1).unwrap();

    let mut txn = store.lock_room(room.id).await.unwrap();
    txn.lock_accounts().await.unwrap();
    let result = txn.post(p1, EntryKind::Payout, 6, "payout");
    assert!(matches!(result, Err(StoreError::BalanceOverflow(id)) if id == p1));
    assert_eq!(txn.balance(p1).unwrap(), i64::MAX - 5);
    assert!(txn.commit().is_empty());

    let mut txn = store.lock_account(p2).await.unwrap();
    let result = txn.post(EntryKind::Adjust, i64::MAX, "credit");
    assert!(matches!(result, Err(StoreError::BalanceOverflow(id)) if id == p2));
    drop(txn);

    assert_eq!(store.balance(p1).await.unwrap(), i64::MAX - 5);
    assert_eq!(store.balance(p2).await.unwrap(), 100);
    assert!(store.entries_for_user(p1).is_empty());
    assert!(store.entries_for_user(p2).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_room_lock_serializes_read_modify_write() {
    let store = Arc::new(Store::new());
    let (room_id, _, _) = seated_room(&store).await;

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let mut txn = store.lock_room(room_id).await.unwrap();
            let seen = txn.room().turn_count;
            tokio::task::yield_now().await;
            txn.room_mut().turn_count = seen + 1;
            txn.commit();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.room(room_id).await.unwrap().turn_count, 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rooms_sharing_players_do_not_deadlock() {
    let store = Arc::new(Store::new());
    let a = store.open_account(10_000);
    let b = store.open_account(10_000);

    // Room 1 seats (a, b); room 2 seats (b, a): opposite seat order.
    let mut rooms = Vec::new();
    for (owner, joiner) in [(a, b), (b, a)] {
        let room = store.insert_room(1, owner).unwrap();
        let mut txn = store.lock_room(room.id).await.unwrap();
        txn.room_mut().player2_id = Some(joiner);
        txn.room_mut().transition(RoomStatus::Full).unwrap();
        txn.commit();
        rooms.push(room.id);
    }

    let mut tasks = Vec::new();
    for i in 0..50 {
        let store = Arc::clone(&store);
        let room_id = rooms[i % 2];
        tasks.push(tokio::spawn(async move {
            let mut txn = store.lock_room(room_id).await.unwrap();
            txn.lock_accounts().await.unwrap();
            let [p1, p2] = txn.room().seated().unwrap();
            txn.post(p1, EntryKind::Adjust, -1, "x").unwrap();
            tokio::task::yield_now().await;
            txn.post(p2, EntryKind::Adjust, 1, "x").unwrap();
            txn.commit();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let total = store.balance(a).await.unwrap() + store.balance(b).await.unwrap();
    assert_eq!(total, 20_000);
    assert_eq!(store.entries_for_user(a).len(), 50);
}
