use serde::{Deserialize, Serialize};

/// Process-unique identifier of one transport connection.
pub type ConnectionId = u64;

/// A connection's participation record within a room.
///
/// Players are keyed by connection, not by `user_id`: a user who reconnects
/// occupies a fresh slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub display_label: String,
    /// Last reported position in the quiz. Regressions are accepted as sent.
    pub progress_index: u32,
    pub correct_count: u32,
    pub finished: bool,
    pub ready: bool,
}

impl PlayerState {
    /// A freshly joined player with zeroed progress.
    pub fn new(connection_id: ConnectionId, user_id: String, display_label: String) -> Self {
        Self {
            connection_id,
            user_id,
            display_label,
            progress_index: 0,
            correct_count: 0,
            finished: false,
            ready: false,
        }
    }

    /// Clear progress and lobby flags.
    pub fn reset(&mut self) {
        self.ready = false;
        self.progress_index = 0;
        self.correct_count = 0;
        self.finished = false;
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            connection_id: self.connection_id,
            user_id: self.user_id.clone(),
            display_label: self.display_label.clone(),
            progress_index: self.progress_index,
            correct_count: self.correct_count,
            finished: self.finished,
            ready: self.ready,
        }
    }
}

/// Externally visible projection of a [`PlayerState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub display_label: String,
    pub progress_index: u32,
    pub correct_count: u32,
    pub finished: bool,
    pub ready: bool,
}
