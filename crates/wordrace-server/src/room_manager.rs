use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;

use wordrace_core::net::messages::{ClientMessage, ServerMessage};
use wordrace_core::player::ConnectionId;
use wordrace_core::registry::RoomRegistry;
use wordrace_core::result::SessionResult;
use wordrace_core::room::{RoomUpdate, RoomView};
use wordrace_core::time::now_millis;

use crate::sink::SharedResultSink;

/// Per-connection sender for outbound server messages. Bounded so a slow
/// client cannot grow memory without limit; each writer task encodes in its
/// own wire format.
pub type PlayerSender = mpsc::Sender<Arc<ServerMessage>>;

/// Aggregate room counters reported by `/health`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoomStats {
    pub active: usize,
    pub players: usize,
    /// Rooms whose race finished but which still have players attached.
    pub completed: usize,
}

/// Owns the room registry plus the transport side: which connection gets
/// which broadcast, and where finished results go.
///
/// Every room transition runs under `&mut self`, so when this sits behind the
/// shared write lock no two events for a room are ever applied concurrently.
pub struct RoomManager {
    registry: RoomRegistry,
    connections: HashMap<ConnectionId, PlayerSender>,
    last_activity: HashMap<String, Instant>,
    next_connection_id: ConnectionId,
    sink: SharedResultSink,
}

impl RoomManager {
    pub fn new(sink: SharedResultSink) -> Self {
        Self {
            registry: RoomRegistry::new(),
            connections: HashMap::new(),
            last_activity: HashMap::new(),
            next_connection_id: 1,
            sink,
        }
    }

    /// Register a new transport connection and return its id.
    pub fn connect(&mut self, sender: PlayerSender) -> ConnectionId {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        self.connections.insert(id, sender);
        id
    }

    /// Apply one client event and deliver its effects. Returns false when the
    /// event was ignored (unknown room or non-member connection).
    pub fn handle_message(&mut self, connection_id: ConnectionId, msg: ClientMessage) -> bool {
        let room_id = msg.room_id().to_string();
        let Some(update) = self.registry.apply(connection_id, msg, now_millis()) else {
            tracing::debug!(connection_id, room_id = %room_id, "Ignored event");
            return false;
        };
        self.last_activity.insert(room_id.clone(), Instant::now());
        self.dispatch(&room_id, update);
        true
    }

    /// Remove a closed connection from every room it joined, notify the
    /// remaining players, and drop rooms that became empty.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
        for (room_id, update) in self.registry.disconnect(connection_id) {
            self.dispatch(&room_id, update);
        }
        let registry = &self.registry;
        self.last_activity
            .retain(|room_id, _| registry.get(room_id).is_some());
    }

    fn dispatch(&self, room_id: &str, update: RoomUpdate) {
        for msg in update.broadcasts {
            self.broadcast_to_room(room_id, Arc::new(msg));
        }
        if !update.results.is_empty() {
            spawn_result_writes(&self.sink, room_id, update.results);
        }
    }

    /// Send a message to every player in a room.
    pub fn broadcast_to_room(&self, room_id: &str, msg: Arc<ServerMessage>) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        for player in room.players() {
            let pid = player.connection_id;
            if let Some(sender) = self.connections.get(&pid)
                && let Err(e) = sender.try_send(Arc::clone(&msg))
            {
                tracing::debug!(
                    connection_id = pid, room_id, error = %e,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }

    /// Sanitized snapshot of an active room.
    pub fn room_view(&self, room_id: &str) -> Option<RoomView> {
        self.registry.get(room_id).map(|r| r.view())
    }

    pub fn stats(&self) -> RoomStats {
        RoomStats {
            active: self.registry.len(),
            players: self.registry.total_players(),
            completed: self.registry.completed_count(),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Remove rooms idle for longer than `max_idle` whose players all lost
    /// their connection without a disconnect being processed. Rooms with at
    /// least one open connection are kept however long they sit quiet.
    /// Returns the number of rooms removed.
    pub fn cleanup_idle_rooms(&mut self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<String> = self
            .registry
            .room_ids()
            .filter(|id| {
                self.last_activity
                    .get(*id)
                    .is_none_or(|t| now.duration_since(*t) >= max_idle)
            })
            .filter(|id| !self.has_live_player(id))
            .map(str::to_string)
            .collect();
        for room_id in &stale {
            self.registry.remove(room_id);
            self.last_activity.remove(room_id);
            tracing::info!(room_id = %room_id, "Idle room evicted");
        }
        stale.len()
    }

    fn has_live_player(&self, room_id: &str) -> bool {
        self.registry.get(room_id).is_some_and(|room| {
            room.players().iter().any(|p| {
                self.connections
                    .get(&p.connection_id)
                    .is_some_and(|sender| !sender.is_closed())
            })
        })
    }

    #[cfg(test)]
    fn room_exists(&self, room_id: &str) -> bool {
        self.registry.get(room_id).is_some()
    }
}

/// Hand each result to the sink on its own task. Failures are logged and
/// dropped; a slow or failing write never holds up the room.
fn spawn_result_writes(sink: &SharedResultSink, room_id: &str, results: Vec<SessionResult>) {
    for result in results {
        let user_id = result.user_id.clone();
        let room_id = room_id.to_string();
        let fut = sink.record(result);
        tokio::spawn(async move {
            match fut.await {
                Ok(()) => {
                    tracing::debug!(room_id = %room_id, user_id = %user_id, "Result recorded");
                },
                Err(e) => {
                    tracing::warn!(
                        room_id = %room_id, user_id = %user_id, error = %e,
                        "Failed to record result"
                    );
                },
            }
        });
    }
}
