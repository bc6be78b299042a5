pub mod net;
pub mod player;
pub mod registry;
pub mod result;
pub mod room;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::net::messages::{
        ClientMessage, JoinMsg, PageReloadedMsg, ProgressMsg, ReadyMsg, StartMsg,
    };
    use crate::player::ConnectionId;
    use crate::room::{RoomSeed, RoomState};

    /// A `join` event with a derived display label and a ten-item quiz.
    pub fn join_msg(room_id: &str, user_id: &str) -> ClientMessage {
        ClientMessage::Join(JoinMsg {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            display_label: format!("{user_id}@example.com"),
            quiz_subject_id: "dict-1".to_string(),
            mode: "classic".to_string(),
            item_order: Some((0..10).collect()),
        })
    }

    pub fn start_msg(room_id: &str, item_order: Vec<u32>) -> ClientMessage {
        ClientMessage::Start(StartMsg {
            room_id: room_id.to_string(),
            item_order,
        })
    }

    pub fn progress_msg(
        room_id: &str,
        progress_index: u32,
        correct_count: u32,
        finished: Option<bool>,
    ) -> ClientMessage {
        ClientMessage::Progress(ProgressMsg {
            room_id: room_id.to_string(),
            progress_index,
            correct_count,
            finished,
        })
    }

    pub fn ready_msg(room_id: &str, ready: bool) -> ClientMessage {
        ClientMessage::Ready(ReadyMsg {
            room_id: room_id.to_string(),
            ready,
        })
    }

    pub fn reload_msg(room_id: &str, user_id: &str) -> ClientMessage {
        ClientMessage::PageReloaded(PageReloadedMsg {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            display_label: format!("{user_id}@example.com"),
        })
    }

    /// A room over a ten-item quiz with players on connections `1..=n`.
    pub fn make_room(room_id: &str, n: usize) -> RoomState {
        let mut room = RoomState::new(
            room_id.to_string(),
            RoomSeed {
                quiz_subject_id: "dict-1".to_string(),
                mode: "classic".to_string(),
                creator_user_id: "u1".to_string(),
                item_order: (0..10).collect(),
            },
        );
        for i in 1..=n {
            let conn = i as ConnectionId;
            room.join(conn, format!("u{i}"), format!("Player{i}"));
        }
        room
    }
}
