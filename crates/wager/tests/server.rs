//! Integration tests for the wager server: the connection gate, the
//! message loop, and broadcasts, over real WebSocket connections.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use wager::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct Fixture {
    addr: String,
    handle: GameHandle,
    store: Arc<Store>,
    p1: (UserId, String),
    p2: (UserId, String),
    outsider: (UserId, String),
}

/// Starts a server on a random port with three funded, logged-in users.
/// The secret number is 42 and the second player opens.
async fn start_server(balance2: i64) -> Fixture {
    let store = Arc::new(Store::new());
    let tokens = TokenRegistry::new();

    let mut users = Vec::new();
    for balance in [500, balance2, 500] {
        let id = store.open_account(balance);
        users.push((id, tokens.issue(id).await));
    }
    let (p1, p2, outsider) = (users[0].clone(), users[1].clone(), users[2].clone());

    let server = WagerServerBuilder::new()
        .bind("127.0.0.1:0")
        .store(Arc::clone(&store))
        .random(Arc::new(FixedRandom::new(42, p2.0)))
        .build(tokens)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let handle = server.handle();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    Fixture {
        addr,
        handle,
        store,
        p1,
        p2,
        outsider,
    }
}

async fn connect(addr: &str, room_id: RoomId, token: &str) -> ClientWs {
    let url = format!("ws://{addr}/ws/rooms/{}/?token={token}", room_id.0);
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("should connect");
    ws
}

/// Reads the next frame, failing the test if none arrives in time.
async fn next_frame(ws: &mut ClientWs) -> Message {
    tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("websocket error")
}

async fn recv(ws: &mut ClientWs) -> ServerMessage {
    match next_frame(ws).await {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("decode"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

async fn expect_close(ws: &mut ClientWs) -> u16 {
    match next_frame(ws).await {
        Message::Close(Some(frame)) => u16::from(frame.code),
        other => panic!("expected a close frame, got {other:?}"),
    }
}

async fn send_text(ws: &mut ClientWs, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("send");
}

async fn guess(ws: &mut ClientWs, value: i64) {
    send_text(ws, &format!(r#"{{"type":"GUESS","payload":{{"value":{value}}}}}"#)).await;
}

fn error_code(msg: ServerMessage) -> ErrorCode {
    match msg {
        ServerMessage::Error { code, .. } => code,
        other => panic!("expected ERROR, got {other:?}"),
    }
}

/// Seats `user` without starting the game, as a join that committed the
/// seat before anyone called the state machine would leave it.
async fn seat_without_start(store: &Store, room_id: RoomId, user: UserId) {
    let mut txn = store.lock_room(room_id).await.unwrap();
    txn.room_mut().player2_id = Some(user);
    txn.room_mut().transition(RoomStatus::Full).unwrap();
    txn.commit();
}

// =========================================================================
// Connection gate
// =========================================================================

#[tokio::test]
async fn test_unknown_token_gets_error_then_closes_4401() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();

    let mut ws = connect(&f.addr, room.id, "not-a-token").await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::AuthenticationRequired);
    assert_eq!(expect_close(&mut ws).await, 4401);
}

#[tokio::test]
async fn test_missing_room_closes_4404() {
    let f = start_server(500).await;

    let mut ws = connect(&f.addr, RoomId(999), &f.p1.1).await;
    assert_eq!(expect_close(&mut ws).await, 4404);
}

#[tokio::test]
async fn test_auth_is_checked_before_room() {
    let f = start_server(500).await;

    let mut ws = connect(&f.addr, RoomId(999), "").await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::AuthenticationRequired);
    assert_eq!(expect_close(&mut ws).await, 4401);
}

#[tokio::test]
async fn test_internal_failure_on_attach_closes_1011_only_that_connection() {
    let f = start_server(500).await;
    let broken = f.handle.create_room(100, f.p1.0).await.unwrap();
    // A seat held by a user with no account cannot have its bet locked.
    seat_without_start(&f.store, broken.id, UserId(9999)).await;

    let mut ws = connect(&f.addr, broken.id, &f.p1.1).await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::InternalError);
    assert_eq!(expect_close(&mut ws).await, 1011);

    // The server keeps serving other rooms.
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();
    f.handle.join_room(room.id, f.p2.0).await.unwrap();
    let mut ws = connect(&f.addr, room.id, &f.p2.1).await;
    match recv(&mut ws).await {
        ServerMessage::Snapshot(snapshot) => {
            assert_eq!(snapshot.status, RoomStatus::Full);
            assert_eq!(snapshot.turn, Some(f.p2.0));
        }
        other => panic!("expected SNAPSHOT, got {other:?}"),
    }
    guess(&mut ws, 42).await;
    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::GameEvent(GameEvent::GameOver { .. })
    ));
}

#[tokio::test]
async fn test_outsider_closes_4403() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();

    let mut ws = connect(&f.addr, room.id, &f.outsider.1).await;
    assert_eq!(expect_close(&mut ws).await, 4403);
}

#[tokio::test]
async fn test_attach_to_open_room_gets_snapshot_then_info() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();

    let mut ws = connect(&f.addr, room.id, &f.p1.1).await;
    match recv(&mut ws).await {
        ServerMessage::Snapshot(snap) => {
            assert_eq!(snap.room, room.id);
            assert_eq!(snap.status, RoomStatus::Open);
            assert_eq!(snap.players, (f.p1.0, None));
            assert_eq!(snap.bet_amount, 100);
        }
        other => panic!("expected SNAPSHOT, got {other:?}"),
    }
    assert_eq!(
        recv(&mut ws).await,
        ServerMessage::info("Waiting for second player")
    );
}

#[tokio::test]
async fn test_snapshot_never_carries_secret_number() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();
    f.handle.join_room(room.id, f.p2.0).await.unwrap();

    let mut ws = connect(&f.addr, room.id, &f.p1.1).await;
    let Message::Text(text) = next_frame(&mut ws).await else {
        panic!("expected a text frame");
    };
    assert!(text.as_str().contains("SNAPSHOT"));
    assert!(!text.as_str().contains("secret"));
    assert!(!text.as_str().contains("42"));
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_full_game_over_websocket() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();

    let mut ws1 = connect(&f.addr, room.id, &f.p1.1).await;
    assert!(matches!(recv(&mut ws1).await, ServerMessage::Snapshot(_)));
    assert!(matches!(recv(&mut ws1).await, ServerMessage::Info { .. }));

    // The join starts the game and tells the player already attached.
    let init = f.handle.join_room(room.id, f.p2.0).await.unwrap();
    assert!(init.started);
    assert_eq!(
        recv(&mut ws1).await,
        ServerMessage::GameEvent(GameEvent::RoomStarted {
            turn: f.p2.0,
            turn_count: 0,
        })
    );
    assert_eq!(f.handle.rooms().balance(f.p1.0).await.unwrap(), 400);
    assert_eq!(f.handle.rooms().balance(f.p2.0).await.unwrap(), 400);

    let mut ws2 = connect(&f.addr, room.id, &f.p2.1).await;
    match recv(&mut ws2).await {
        ServerMessage::Snapshot(snap) => {
            assert_eq!(snap.status, RoomStatus::Full);
            assert_eq!(snap.turn, Some(f.p2.0));
        }
        other => panic!("expected SNAPSHOT, got {other:?}"),
    }

    guess(&mut ws2, 50).await;
    let expected = ServerMessage::GameEvent(GameEvent::Guess {
        by: f.p2.0,
        value: 50,
        hint: Hint::Lower,
        next_turn: f.p1.0,
        turn_count: 1,
    });
    assert_eq!(recv(&mut ws1).await, expected);
    assert_eq!(recv(&mut ws2).await, expected);

    guess(&mut ws1, 42).await;
    for ws in [&mut ws1, &mut ws2] {
        match recv(ws).await {
            ServerMessage::GameEvent(GameEvent::GameOver {
                winner,
                number,
                turn_count,
                ..
            }) => {
                assert_eq!(winner, f.p1.0);
                assert_eq!(number, 42);
                assert_eq!(turn_count, 2);
            }
            other => panic!("expected GAME_OVER, got {other:?}"),
        }
    }

    assert_eq!(f.handle.rooms().balance(f.p1.0).await.unwrap(), 600);
    assert_eq!(f.handle.rooms().balance(f.p2.0).await.unwrap(), 400);

    guess(&mut ws2, 42).await;
    assert_eq!(error_code(recv(&mut ws2).await), ErrorCode::RoomFinished);
}

#[tokio::test]
async fn test_attach_starts_seated_room_and_broadcasts() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();
    seat_without_start(&f.store, room.id, f.p2.0).await;

    let mut ws = connect(&f.addr, room.id, &f.p1.1).await;
    match recv(&mut ws).await {
        ServerMessage::Snapshot(snap) => {
            assert_eq!(snap.status, RoomStatus::Full);
            assert_eq!(snap.turn, Some(f.p2.0));
        }
        other => panic!("expected SNAPSHOT, got {other:?}"),
    }
    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::GameEvent(GameEvent::RoomStarted { .. })
    ));
    assert_eq!(f.handle.rooms().room_entries(room.id).len(), 2);
}

#[tokio::test]
async fn test_attach_with_unfunded_opponent_reports_and_stays_open() {
    let f = start_server(0).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();
    seat_without_start(&f.store, room.id, f.p2.0).await;

    let mut ws = connect(&f.addr, room.id, &f.p1.1).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::Snapshot(_)));
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::InsufficientFunds);

    // Still usable: the next guess hits the same wall.
    guess(&mut ws, 10).await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::InsufficientFunds);
    assert_eq!(f.handle.rooms().balance(f.p1.0).await.unwrap(), 500);
}

#[tokio::test]
async fn test_bad_frames_get_errors_and_connection_stays_open() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();
    f.handle.join_room(room.id, f.p2.0).await.unwrap();

    let mut ws = connect(&f.addr, room.id, &f.p1.1).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::Snapshot(_)));

    send_text(&mut ws, r#"{"type":"GUESS","payload":{"value":"abc"}}"#).await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::InvalidGuessValue);

    send_text(&mut ws, r#"{"type":"GUESS","payload":{"value":4.5}}"#).await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::InvalidGuessValue);

    send_text(&mut ws, r#"{"type":"HELLO"}"#).await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::UnknownMessageType);

    send_text(&mut ws, "not json").await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::UnknownMessageType);

    // Player 2 opens, so a well-formed guess from player 1 is out of turn.
    guess(&mut ws, 42).await;
    assert_eq!(error_code(recv(&mut ws).await), ErrorCode::NotYourTurn);

    let snap = f.handle.rooms().snapshot(room.id).await.unwrap();
    assert_eq!(snap.turn_count, 0);
    assert_eq!(snap.turn, Some(f.p2.0));
}

#[tokio::test]
async fn test_guess_in_open_room_says_wait() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();

    let mut ws = connect(&f.addr, room.id, &f.p1.1).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::Snapshot(_)));
    assert!(matches!(recv(&mut ws).await, ServerMessage::Info { .. }));

    guess(&mut ws, 42).await;
    assert_eq!(
        error_code(recv(&mut ws).await),
        ErrorCode::WaitingForSecondPlayer
    );
}

#[tokio::test]
async fn test_join_rejections_through_handle() {
    let f = start_server(500).await;
    let room = f.handle.create_room(100, f.p1.0).await.unwrap();

    let err = f.handle.join_room(room.id, f.p1.0).await.unwrap_err();
    assert!(matches!(err, WagerError::Room(RoomError::OwnRoom(_))));

    f.handle.join_room(room.id, f.p2.0).await.unwrap();
    let err = f.handle.join_room(room.id, f.outsider.0).await.unwrap_err();
    assert!(matches!(err, WagerError::Room(RoomError::RoomFull(_))));
}
