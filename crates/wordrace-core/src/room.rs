use serde::{Deserialize, Serialize};

use crate::net::messages::{PageReloadNoticeMsg, ServerMessage, StartedMsg, WinnerMsg};
use crate::player::{ConnectionId, PlayerState, PlayerView};
use crate::result::SessionResult;

/// Minimum number of players before an all-ready lobby starts on its own.
pub const AUTO_START_MIN_PLAYERS: usize = 2;

/// Room metadata supplied by whoever creates the room. Later joiners'
/// metadata is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSeed {
    pub quiz_subject_id: String,
    pub mode: String,
    pub creator_user_id: String,
    pub item_order: Vec<u32>,
}

/// Side effects produced by a single room transition.
///
/// `broadcasts` go to every member of the room in order; `results` are
/// handed to the result sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomUpdate {
    pub broadcasts: Vec<ServerMessage>,
    pub results: Vec<SessionResult>,
}

impl RoomUpdate {
    pub fn is_empty(&self) -> bool {
        self.broadcasts.is_empty() && self.results.is_empty()
    }

    /// The declared winner, if this transition completed the race.
    pub fn winner(&self) -> Option<&WinnerMsg> {
        self.broadcasts.iter().find_map(|m| match m {
            ServerMessage::Winner(w) => Some(w),
            _ => None,
        })
    }
}

/// Externally visible projection of a [`RoomState`]. Excludes the creator
/// and the completion latch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub room_id: String,
    pub quiz_subject_id: String,
    pub mode: String,
    pub started_at: Option<u64>,
    pub item_order: Vec<u32>,
    pub players: Vec<PlayerView>,
}

/// A single race room. All transitions are synchronous and return the
/// effects the host must deliver.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room_id: String,
    pub quiz_subject_id: String,
    pub mode: String,
    pub creator_user_id: String,
    pub started_at: Option<u64>,
    pub item_order: Vec<u32>,
    /// Insertion-ordered; position decides winner ties.
    players: Vec<PlayerState>,
    completed: bool,
}

impl RoomState {
    pub fn new(room_id: String, seed: RoomSeed) -> Self {
        Self {
            room_id,
            quiz_subject_id: seed.quiz_subject_id,
            mode: seed.mode,
            creator_user_id: seed.creator_user_id,
            started_at: None,
            item_order: seed.item_order,
            players: Vec::new(),
            completed: false,
        }
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn player(&self, connection_id: ConnectionId) -> Option<&PlayerState> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    fn player_mut(&mut self, connection_id: ConnectionId) -> Option<&mut PlayerState> {
        self.players
            .iter_mut()
            .find(|p| p.connection_id == connection_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn view(&self) -> RoomView {
        RoomView {
            room_id: self.room_id.clone(),
            quiz_subject_id: self.quiz_subject_id.clone(),
            mode: self.mode.clone(),
            started_at: self.started_at,
            item_order: self.item_order.clone(),
            players: self.players.iter().map(PlayerState::view).collect(),
        }
    }

    fn state_message(&self) -> ServerMessage {
        ServerMessage::State(self.view())
    }

    fn started_message(&self, started_at: u64) -> ServerMessage {
        ServerMessage::Started(StartedMsg {
            room_id: self.room_id.clone(),
            started_at,
            item_order: self.item_order.clone(),
        })
    }

    /// Add this connection as a fresh player, or reset its existing slot.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        user_id: String,
        display_label: String,
    ) -> RoomUpdate {
        let fresh = PlayerState::new(connection_id, user_id, display_label);
        match self.player_mut(connection_id) {
            Some(existing) => *existing = fresh,
            None => self.players.push(fresh),
        }
        RoomUpdate {
            broadcasts: vec![self.state_message()],
            results: Vec::new(),
        }
    }

    /// Explicit start. Always overwrites the item order and start time so a
    /// host can restart a running race.
    pub fn start(&mut self, item_order: &[u32], now: u64) -> RoomUpdate {
        self.item_order = item_order.to_vec();
        self.started_at = Some(now);
        RoomUpdate {
            broadcasts: vec![self.started_message(now)],
            results: Vec::new(),
        }
    }

    /// Record a progress tick and run the completion check.
    ///
    /// The completion latch is read and written inside this call, so two
    /// ticks serialized through the same `&mut self` can never both declare a
    /// winner.
    pub fn progress(
        &mut self,
        connection_id: ConnectionId,
        progress_index: u32,
        correct_count: u32,
        finished: Option<bool>,
    ) -> RoomUpdate {
        let Some(player) = self.player_mut(connection_id) else {
            return RoomUpdate::default();
        };
        player.progress_index = progress_index;
        player.correct_count = correct_count;
        if let Some(finished) = finished {
            player.finished = finished;
        }

        let mut update = RoomUpdate {
            broadcasts: vec![self.state_message()],
            results: Vec::new(),
        };

        if self.completed || !self.all_finished() {
            return update;
        }
        self.completed = true;

        if let Some(winner) = select_winner(&self.players) {
            tracing::info!(
                room_id = %self.room_id,
                connection_id = winner.connection_id,
                user_id = %winner.user_id,
                correct = winner.correct_count,
                "Race complete"
            );
            update.broadcasts.push(ServerMessage::Winner(WinnerMsg {
                room_id: self.room_id.clone(),
                connection_id: winner.connection_id,
                user_id: winner.user_id.clone(),
            }));
        }

        update.results = self
            .players
            .iter()
            .filter(|p| p.finished)
            .map(|p| {
                SessionResult::multiplayer(
                    &p.user_id,
                    &self.quiz_subject_id,
                    &self.mode,
                    p.correct_count,
                    self.item_order.len(),
                )
            })
            .collect();

        update
    }

    /// True when the room has players and every one of them has finished.
    pub fn all_finished(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.finished)
    }

    /// Lobby ready toggle. Starts the race once enough players are ready.
    pub fn set_ready(&mut self, connection_id: ConnectionId, ready: bool, now: u64) -> RoomUpdate {
        let Some(player) = self.player_mut(connection_id) else {
            return RoomUpdate::default();
        };
        player.ready = ready;

        let mut update = RoomUpdate {
            broadcasts: vec![self.state_message()],
            results: Vec::new(),
        };

        if self.started_at.is_none()
            && self.players.len() >= AUTO_START_MIN_PLAYERS
            && self.players.iter().all(|p| p.ready)
        {
            self.started_at = Some(now);
            tracing::info!(room_id = %self.room_id, players = self.players.len(), "Auto-start");
            update.broadcasts.push(self.started_message(now));
        }

        update
    }

    /// Room-wide soft reset triggered by one participant reloading.
    /// Leaves the completion latch and item order untouched.
    pub fn reload(&mut self, user_id: String, display_label: String) -> RoomUpdate {
        for p in &mut self.players {
            p.reset();
        }
        self.started_at = None;
        RoomUpdate {
            broadcasts: vec![
                self.state_message(),
                ServerMessage::PageReloaded(PageReloadNoticeMsg {
                    user_id,
                    display_label,
                }),
            ],
            results: Vec::new(),
        }
    }

    /// Drop a connection's player. Returns `None` if it was not a member.
    pub fn remove_player(&mut self, connection_id: ConnectionId) -> Option<RoomUpdate> {
        let before = self.players.len();
        self.players.retain(|p| p.connection_id != connection_id);
        if self.players.len() == before {
            return None;
        }
        Some(RoomUpdate {
            broadcasts: vec![self.state_message()],
            results: Vec::new(),
        })
    }
}

/// Highest `correct_count` wins; ties keep the earliest player.
pub fn select_winner(players: &[PlayerState]) -> Option<&PlayerState> {
    let mut iter = players.iter();
    let first = iter.next()?;
    Some(iter.fold(first, |best, p| {
        if p.correct_count > best.correct_count {
            p
        } else {
            best
        }
    }))
}
