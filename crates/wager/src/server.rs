//! `WagerServer` builder and server loop.
//!
//! This is the entry point for running a wager room server. It ties
//! together all the layers: transport → protocol → session → room engine.

use std::sync::Arc;

use wager_protocol::{Codec, JsonCodec, RoomId, ServerMessage, UserId};
use wager_room::{BetLimits, Initialized, RandomSource, RoomManager, SeededRandom};
use wager_session::Authenticator;
use wager_store::{Room, Store};
use wager_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Broadcaster, WagerError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing
/// here needs an outer lock: the room manager locks per room and the
/// broadcaster locks only for map updates.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) rooms: Arc<RoomManager>,
    pub(crate) broadcaster: Arc<Broadcaster>,
    pub(crate) auth: A,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a wager server.
///
/// # Example
///
/// ```rust,ignore
/// use wager::prelude::*;
///
/// let server = WagerServer::builder()
///     .bind("0.0.0.0:8080")
///     .store(store)
///     .build(tokens)
///     .await?;
/// server.run().await
/// ```
pub struct WagerServerBuilder {
    bind_addr: String,
    store: Option<Arc<Store>>,
    random: Option<Arc<dyn RandomSource>>,
    bet_limits: Option<BetLimits>,
}

impl WagerServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            store: None,
            random: None,
            bet_limits: Some(BetLimits::default()),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Uses an existing store instead of a fresh empty one.
    pub fn store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the randomness source. Defaults to an OS-seeded one.
    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Sets the bet limits for new rooms. `None` accepts any positive bet.
    pub fn bet_limits(mut self, limits: Option<BetLimits>) -> Self {
        self.bet_limits = limits;
        self
    }

    /// Binds the listener and builds the server with the given
    /// authenticator. Uses `JsonCodec` on the wire.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<WagerServer<A, JsonCodec>, WagerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let store = self.store.unwrap_or_default();
        let random = self
            .random
            .unwrap_or_else(|| Arc::new(SeededRandom::from_os_rng()));
        let rooms = RoomManager::new(store, random).with_bet_limits(self.bet_limits);

        let state = Arc::new(ServerState {
            rooms: Arc::new(rooms),
            broadcaster: Arc::new(Broadcaster::new()),
            auth,
            codec: JsonCodec,
        });

        Ok(WagerServer { transport, state })
    }
}

impl Default for WagerServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A wager server bound to its listener.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct WagerServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> WagerServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> WagerServerBuilder {
        WagerServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle for the create/join side, usable while the server runs.
    pub fn handle(&self) -> GameHandle {
        GameHandle {
            rooms: Arc::clone(&self.state.rooms),
            broadcaster: Arc::clone(&self.state.broadcaster),
        }
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated; a failed accept or a failed connection is
    /// logged and never stops the loop.
    pub async fn run(mut self) -> Result<(), WagerError> {
        tracing::info!("wager server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// The create/join entry points, for whatever sits in front of the
/// server (an HTTP API, an admin tool, a test).
///
/// Joins go through here rather than straight to the [`RoomManager`] so
/// that a join which starts the game announces it to connections already
/// attached to the room.
#[derive(Clone)]
pub struct GameHandle {
    rooms: Arc<RoomManager>,
    broadcaster: Arc<Broadcaster>,
}

impl GameHandle {
    /// The room engine, for reads and balance adjustments.
    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    /// Creates an open room with `owner` in the first seat.
    pub async fn create_room(&self, bet_amount: i64, owner: UserId) -> Result<Room, WagerError> {
        Ok(self.rooms.create_room(bet_amount, owner).await?)
    }

    /// Seats `user` in the room and starts the game, announcing
    /// `ROOM_STARTED` to the room's live connections.
    pub async fn join_room(&self, room_id: RoomId, user: UserId) -> Result<Initialized, WagerError> {
        let init = self.rooms.join_room(room_id, user).await?;
        if let Some(event) = init.started_event() {
            self.broadcaster
                .publish(room_id, ServerMessage::GameEvent(event));
        }
        Ok(init)
    }
}
