//! Per-connection handler: the connection gate and the message loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Authenticate the `?token=` → `UserId` (ERROR, then close 4401)
//!   2. Look up the room from the path (close 4404)
//!   3. Check the user holds a seat (close 4403)
//!   4. Subscribe to the room, start the game if ready, send SNAPSHOT
//!   5. Loop: forward room broadcasts out, apply GUESS messages in

use std::sync::Arc;

use tokio::sync::mpsc;
use wager_protocol::{
    ClientMessage, CloseReason, Codec, ErrorCode, RoomId, RoomStatus, ServerMessage, UserId,
};
use wager_room::RoomError;
use wager_session::Authenticator;
use wager_transport::{Connection, WebSocketConnection};

use crate::WagerError;
use crate::route;
use crate::server::ServerState;

const WAITING_FOR_SECOND_PLAYER: &str = "Waiting for second player";

/// Handles a single connection from accept to close.
///
/// Any error that escapes the session is treated as an internal failure
/// of this connection only: one `internal_error` message, then close
/// with 1011.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), WagerError>
where
    A: Authenticator,
    C: Codec,
{
    let result = attach_and_serve(&conn, &state).await;
    if let Err(e) = &result {
        tracing::error!(conn_id = %conn.id(), error = %e, "connection failed");
        let msg = ServerMessage::error(ErrorCode::InternalError, "internal error");
        let _ = send(&conn, &state.codec, &msg).await;
        let reason = CloseReason::InternalError;
        let _ = conn.close_with(reason.code(), reason.as_str()).await;
    }
    result
}

async fn attach_and_serve<A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, C>>,
) -> Result<(), WagerError>
where
    A: Authenticator,
    C: Codec,
{
    let Some((room_id, user_id)) = admit(conn, state).await? else {
        return Ok(());
    };
    let conn_id = conn.id();
    tracing::info!(%conn_id, %room_id, %user_id, "connection attached");

    let (_subscription, rx) = state.broadcaster.subscribe(room_id, conn_id);

    match state.rooms.initialize_if_ready(room_id).await {
        Ok(init) => {
            send(conn, &state.codec, &ServerMessage::Snapshot(init.snapshot.clone())).await?;
            if init.snapshot.status == RoomStatus::Open {
                send(conn, &state.codec, &ServerMessage::info(WAITING_FOR_SECOND_PLAYER)).await?;
            }
            if let Some(event) = init.started_event() {
                state
                    .broadcaster
                    .publish(room_id, ServerMessage::GameEvent(event));
            }
        }
        Err(e) if e.is_internal() => return Err(e.into()),
        Err(e) => {
            // The room could not start (a player cannot cover the bet);
            // still show the room and say why.
            tracing::debug!(%conn_id, %room_id, error = %e, "game not started on attach");
            let snapshot = state.rooms.snapshot(room_id).await?;
            send(conn, &state.codec, &ServerMessage::Snapshot(snapshot)).await?;
            send(conn, &state.codec, &ServerMessage::error(e.code(), e.to_string())).await?;
        }
    }

    serve(conn, state, room_id, user_id, rx).await?;
    tracing::info!(%conn_id, %room_id, %user_id, "connection closed");
    Ok(())
}

/// Runs the gate checks in order. Returns `None` if the connection was
/// rejected and closed.
async fn admit<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
) -> Result<Option<(RoomId, UserId)>, WagerError>
where
    A: Authenticator,
    C: Codec,
{
    let target = route::parse(conn.request_uri());

    let user_id = match state.auth.authenticate(&target.token).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "authentication failed");
            let msg = ServerMessage::error(ErrorCode::AuthenticationRequired, e.to_string());
            send(conn, &state.codec, &msg).await?;
            reject(conn, CloseReason::Unauthenticated).await?;
            return Ok(None);
        }
    };

    let Some(room_id) = target.room_id else {
        reject(conn, CloseReason::RoomNotFound).await?;
        return Ok(None);
    };
    let snapshot = match state.rooms.snapshot(room_id).await {
        Ok(snapshot) => snapshot,
        Err(RoomError::RoomNotFound(_)) => {
            reject(conn, CloseReason::RoomNotFound).await?;
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let (player1, player2) = snapshot.players;
    if user_id != player1 && Some(user_id) != player2 {
        tracing::debug!(conn_id = %conn.id(), %room_id, %user_id, "not a participant");
        reject(conn, CloseReason::NotParticipant).await?;
        return Ok(None);
    }

    Ok(Some((room_id, user_id)))
}

/// The message loop. Returns when the client goes away.
async fn serve<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
    room_id: RoomId,
    user_id: UserId,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<(), WagerError>
where
    A: Authenticator,
    C: Codec,
{
    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => handle_inbound(conn, state, room_id, user_id, &data).await?,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "recv error");
                    break;
                }
            },
            Some(msg) = rx.recv() => send(conn, &state.codec, &msg).await?,
        }
    }
    Ok(())
}

/// Decodes one client frame and applies it.
///
/// Malformed input and rule violations get an `ERROR` reply; the
/// connection stays open. Internal failures bubble up and end it.
async fn handle_inbound<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
    room_id: RoomId,
    user_id: UserId,
    data: &[u8],
) -> Result<(), WagerError>
where
    A: Authenticator,
    C: Codec,
{
    let value = match ClientMessage::decode(&state.codec, data) {
        Ok(ClientMessage::Guess { value }) => value,
        Err(e) => {
            tracing::debug!(%room_id, %user_id, error = %e, "rejected client frame");
            return send(conn, &state.codec, &ServerMessage::error(e.code(), e.to_string())).await;
        }
    };

    match state.rooms.apply_guess(room_id, user_id, value).await {
        Ok(outcome) => {
            // Published after the guess committed; delivery never
            // feeds back into the game state.
            for event in outcome.events() {
                state
                    .broadcaster
                    .publish(room_id, ServerMessage::GameEvent(event.clone()));
            }
            Ok(())
        }
        Err(e) if e.is_internal() => Err(e.into()),
        Err(e) => {
            tracing::debug!(%room_id, %user_id, error = %e, "guess rejected");
            send(conn, &state.codec, &ServerMessage::error(e.code(), e.to_string())).await
        }
    }
}

async fn reject(conn: &WebSocketConnection, reason: CloseReason) -> Result<(), WagerError> {
    tracing::debug!(conn_id = %conn.id(), %reason, "closing connection");
    conn.close_with(reason.code(), reason.as_str()).await?;
    Ok(())
}

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    msg: &ServerMessage,
) -> Result<(), WagerError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}
