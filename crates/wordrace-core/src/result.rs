use serde::{Deserialize, Serialize};

/// One finished player's tally, handed to the durable session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub user_id: String,
    pub quiz_subject_id: String,
    pub recalled: u32,
    pub not_recalled: u32,
    pub unknown: u32,
    pub mode: String,
    pub is_multiplayer: bool,
}

impl SessionResult {
    /// Build a multiplayer result. Items never answered correctly count as
    /// not recalled; `unknown` is always zero in a race.
    pub fn multiplayer(
        user_id: &str,
        quiz_subject_id: &str,
        mode: &str,
        correct_count: u32,
        item_count: usize,
    ) -> Self {
        let item_count = u32::try_from(item_count).unwrap_or(u32::MAX);
        Self {
            user_id: user_id.to_string(),
            quiz_subject_id: quiz_subject_id.to_string(),
            recalled: correct_count,
            not_recalled: item_count.saturating_sub(correct_count),
            unknown: 0,
            mode: mode.to_string(),
            is_multiplayer: true,
        }
    }
}
