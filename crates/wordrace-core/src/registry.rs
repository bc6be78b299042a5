use std::collections::HashMap;

use crate::net::messages::ClientMessage;
use crate::player::ConnectionId;
use crate::room::{RoomSeed, RoomState, RoomUpdate};

/// Owned map of active rooms. A room exists exactly while it has players.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, RoomState>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, room_id: &str) -> Option<&RoomState> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut RoomState> {
        self.rooms.get_mut(room_id)
    }

    /// Fetch a room, creating it from `seed` if absent. The flag is true when
    /// the room was created by this call.
    pub fn get_or_create(&mut self, room_id: &str, seed: RoomSeed) -> (&mut RoomState, bool) {
        let created = !self.rooms.contains_key(room_id);
        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomState::new(room_id.to_string(), seed));
        (room, created)
    }

    /// Remove the room if it has no players. Returns true if removed.
    pub fn remove_if_empty(&mut self, room_id: &str) -> bool {
        if self.rooms.get(room_id).is_some_and(RoomState::is_empty) {
            self.rooms.remove(room_id);
            return true;
        }
        false
    }

    /// Unconditional removal, used by the idle sweep.
    pub fn remove(&mut self, room_id: &str) -> Option<RoomState> {
        self.rooms.remove(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.values().map(RoomState::player_count).sum()
    }

    /// Rooms whose race has already declared a winner.
    pub fn completed_count(&self) -> usize {
        self.rooms.values().filter(|r| r.is_completed()).count()
    }

    pub fn room_ids(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(String::as_str)
    }

    /// Route one client event to its room. Returns `None` when the event
    /// references an unknown room or a connection that is not a player.
    pub fn apply(
        &mut self,
        connection_id: ConnectionId,
        msg: ClientMessage,
        now: u64,
    ) -> Option<RoomUpdate> {
        let update = match msg {
            ClientMessage::Join(join) => {
                let seed = RoomSeed {
                    quiz_subject_id: join.quiz_subject_id,
                    mode: join.mode,
                    creator_user_id: join.user_id.clone(),
                    item_order: join.item_order.unwrap_or_default(),
                };
                let (room, created) = self.get_or_create(&join.room_id, seed);
                if created {
                    tracing::info!(
                        room_id = %join.room_id,
                        creator = %room.creator_user_id,
                        "Room created"
                    );
                }
                room.join(connection_id, join.user_id, join.display_label)
            },
            ClientMessage::Start(start) => {
                self.rooms.get_mut(&start.room_id)?.start(&start.item_order, now)
            },
            ClientMessage::Progress(p) => self.rooms.get_mut(&p.room_id)?.progress(
                connection_id,
                p.progress_index,
                p.correct_count,
                p.finished,
            ),
            ClientMessage::Ready(r) => {
                self.rooms
                    .get_mut(&r.room_id)?
                    .set_ready(connection_id, r.ready, now)
            },
            ClientMessage::PageReloaded(r) => self
                .rooms
                .get_mut(&r.room_id)?
                .reload(r.user_id, r.display_label),
        };
        if update.is_empty() {
            return None;
        }
        Some(update)
    }

    /// Remove a closed connection from every room it belongs to. Returns the
    /// per-room updates for rooms that still have players; emptied rooms are
    /// destroyed.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Vec<(String, RoomUpdate)> {
        let mut updates = Vec::new();
        let mut emptied = Vec::new();
        for (room_id, room) in &mut self.rooms {
            if let Some(update) = room.remove_player(connection_id) {
                if room.is_empty() {
                    emptied.push(room_id.clone());
                } else {
                    updates.push((room_id.clone(), update));
                }
            }
        }
        for room_id in emptied {
            if self.remove_if_empty(&room_id) {
                tracing::info!(room_id = %room_id, "Room destroyed");
            }
        }
        updates
    }
}
