//! Room-scoped fan-out of server messages to live connections.
//!
//! Each connection attached to a room holds a [`Subscription`] and drains
//! its own unbounded channel. Publishing never waits on a slow client:
//! the message is queued for every subscriber present at publish time,
//! and a subscriber that joins later never sees it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use wager_protocol::{RoomId, ServerMessage};
use wager_transport::ConnectionId;

type Group = HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>;

/// Registry of broadcast groups, one per room with live connections.
#[derive(Debug, Default)]
pub struct Broadcaster {
    groups: Mutex<HashMap<RoomId, Group>>,
}

impl Broadcaster {
    /// Creates an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to the room's group.
    ///
    /// The connection stays subscribed until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        room_id: RoomId,
        conn_id: ConnectionId,
    ) -> (Subscription, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.groups
            .lock()
            .entry(room_id)
            .or_default()
            .insert(conn_id, tx);
        tracing::debug!(%room_id, %conn_id, "subscribed to room");

        let subscription = Subscription {
            broadcaster: Arc::clone(self),
            room_id,
            conn_id,
        };
        (subscription, rx)
    }

    /// Queues `msg` for every connection currently in the room's group.
    ///
    /// Returns how many connections it was queued for.
    pub fn publish(&self, room_id: RoomId, msg: ServerMessage) -> usize {
        let mut groups = self.groups.lock();
        let Some(group) = groups.get_mut(&room_id) else {
            return 0;
        };
        group.retain(|_, tx| tx.send(msg.clone()).is_ok());
        let delivered = group.len();
        if group.is_empty() {
            groups.remove(&room_id);
        }
        tracing::debug!(%room_id, delivered, "published to room");
        delivered
    }

    /// How many connections are subscribed to the room.
    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.groups.lock().get(&room_id).map_or(0, HashMap::len)
    }

    fn unsubscribe(&self, room_id: RoomId, conn_id: ConnectionId) {
        let mut groups = self.groups.lock();
        if let Some(group) = groups.get_mut(&room_id) {
            group.remove(&conn_id);
            if group.is_empty() {
                groups.remove(&room_id);
            }
        }
        tracing::debug!(%room_id, %conn_id, "unsubscribed from room");
    }
}

/// Drop guard that removes a connection from its room's group.
pub struct Subscription {
    broadcaster: Arc<Broadcaster>,
    room_id: RoomId,
    conn_id: ConnectionId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.room_id, self.conn_id);
    }
}
