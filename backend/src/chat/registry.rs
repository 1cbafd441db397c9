//! In-memory room membership.
//!
//! Connections are addressed by an opaque [`ConnectionId`]; the registry owns
//! each connection's outbound queue, so once `leave` runs nothing can reach a
//! closed socket through a stale room entry.
//!
//! Joining is two-phase. Between `begin_join` and `complete_join` the
//! connection is a room member, but room broadcasts are held back for it, so
//! the backlog always reaches the socket before any live message.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

use crate::chat::protocol::ServerEvent;
use crate::models::chat::ChatMessage;
use crate::types::VideoId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    sender: mpsc::UnboundedSender<ServerEvent>,
    rooms: HashSet<VideoId>,
    /// Broadcasts held back per room until that room's backlog is sent.
    pending: HashMap<VideoId, Vec<ServerEvent>>,
}

#[derive(Default)]
struct RegistryState {
    rooms: HashMap<VideoId, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, Connection>,
}

impl RegistryState {
    fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.remove(&id) else {
            return false;
        };
        for video_id in connection.rooms {
            self.remove_member(video_id, id);
        }
        true
    }

    fn remove_member(&mut self, video_id: VideoId, id: ConnectionId) {
        if let Some(members) = self.rooms.get_mut(&video_id) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(&video_id);
            }
        }
    }
}

#[derive(Default)]
pub struct RoomRegistry {
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live connection and hands back the queue its socket drains.
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state.write().await.connections.insert(
            id,
            Connection {
                sender,
                rooms: HashSet::new(),
                pending: HashMap::new(),
            },
        );
        (id, receiver)
    }

    /// Adds the connection to the room, creating the room on first join, and
    /// starts holding back the room's broadcasts for it.
    ///
    /// Returns `false` if the connection is no longer registered.
    pub async fn begin_join(&self, id: ConnectionId, video_id: VideoId) -> bool {
        let mut state = self.state.write().await;
        let Some(connection) = state.connections.get_mut(&id) else {
            return false;
        };
        connection.rooms.insert(video_id);
        connection.pending.entry(video_id).or_default();
        state.rooms.entry(video_id).or_default().insert(id);
        true
    }

    /// Sends the backlog, then whatever was broadcast to the room since
    /// `begin_join`, skipping messages the backlog already carries.
    ///
    /// Returns `false` if the connection is gone.
    pub async fn complete_join(
        &self,
        id: ConnectionId,
        video_id: VideoId,
        backlog: Vec<ChatMessage>,
    ) -> bool {
        let mut state = self.state.write().await;
        let Some(connection) = state.connections.get_mut(&id) else {
            return false;
        };
        let held = connection.pending.remove(&video_id).unwrap_or_default();
        let seen: HashSet<_> = backlog.iter().map(|message| message.id).collect();

        let mut open = connection
            .sender
            .send(ServerEvent::PreviousMessages(backlog))
            .is_ok();
        for event in held {
            if matches!(&event, ServerEvent::ChatMessage(message) if seen.contains(&message.id)) {
                continue;
            }
            open = open && connection.sender.send(event).is_ok();
        }

        if !open {
            state.remove_connection(id);
        }
        open
    }

    /// Backs out of a join whose backlog could not be loaded. Held messages
    /// are dropped along with the membership.
    pub async fn abort_join(&self, id: ConnectionId, video_id: VideoId) {
        let mut state = self.state.write().await;
        let Some(connection) = state.connections.get_mut(&id) else {
            return;
        };
        connection.pending.remove(&video_id);
        connection.rooms.remove(&video_id);
        state.remove_member(video_id, id);
    }

    /// Drops the connection from every room it joined. Empty rooms are pruned.
    pub async fn leave(&self, id: ConnectionId) {
        self.state.write().await.remove_connection(id);
    }

    /// Queues the event for every current member of the room.
    ///
    /// Members whose socket has gone away are removed on the spot. Returns
    /// the number of connections the event was queued or held for.
    pub async fn broadcast(&self, video_id: VideoId, event: &ServerEvent) -> usize {
        // Held for the whole fan-out so every member sees one room order.
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let Some(members) = state.rooms.get(&video_id) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for id in members {
            let Some(connection) = state.connections.get_mut(id) else {
                dead.push(*id);
                continue;
            };
            if let Some(held) = connection.pending.get_mut(&video_id) {
                held.push(event.clone());
                delivered += 1;
            } else if connection.sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }

        for id in dead {
            tracing::debug!(connection = %id, "Pruning closed chat connection");
            state.remove_connection(id);
        }
        delivered
    }

    /// Sends to a single connection. Returns `false` when it is gone.
    pub async fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        let state = self.state.read().await;
        state
            .connections
            .get(&id)
            .map(|connection| connection.sender.send(event).is_ok())
            .unwrap_or(false)
    }

    pub async fn room_size(&self, video_id: VideoId) -> usize {
        self.state
            .read()
            .await
            .rooms
            .get(&video_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }
}
