use serde::{Deserialize, Serialize};

use crate::player::ConnectionId;
use crate::room::RoomView;

/// Binary message type discriminator (first byte of a MessagePack frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    Join = 0x01,
    Start = 0x02,
    Progress = 0x03,
    Ready = 0x04,
    PageReloaded = 0x05,

    // Server -> Client
    State = 0x10,
    Started = 0x11,
    Winner = 0x12,
    PageReloadNotice = 0x13,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Join),
            0x02 => Some(Self::Start),
            0x03 => Some(Self::Progress),
            0x04 => Some(Self::Ready),
            0x05 => Some(Self::PageReloaded),
            0x10 => Some(Self::State),
            0x11 => Some(Self::Started),
            0x12 => Some(Self::Winner),
            0x13 => Some(Self::PageReloadNotice),
            _ => None,
        }
    }
}

/// Events a client may send. JSON form: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    Join(JoinMsg),
    Start(StartMsg),
    Progress(ProgressMsg),
    Ready(ReadyMsg),
    PageReloaded(PageReloadedMsg),
}

impl ClientMessage {
    /// Room the event is addressed to.
    pub fn room_id(&self) -> &str {
        match self {
            Self::Join(m) => &m.room_id,
            Self::Start(m) => &m.room_id,
            Self::Progress(m) => &m.room_id,
            Self::Ready(m) => &m.room_id,
            Self::PageReloaded(m) => &m.room_id,
        }
    }
}

/// Events the server emits to room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    State(RoomView),
    Started(StartedMsg),
    Winner(WinnerMsg),
    PageReloaded(PageReloadNoticeMsg),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMsg {
    pub room_id: String,
    pub user_id: String,
    pub display_label: String,
    pub quiz_subject_id: String,
    pub mode: String,
    #[serde(default)]
    pub item_order: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMsg {
    pub room_id: String,
    pub item_order: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMsg {
    pub room_id: String,
    pub progress_index: u32,
    pub correct_count: u32,
    #[serde(default)]
    pub finished: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyMsg {
    pub room_id: String,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReloadedMsg {
    pub room_id: String,
    pub user_id: String,
    pub display_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedMsg {
    pub room_id: String,
    pub started_at: u64,
    pub item_order: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerMsg {
    pub room_id: String,
    pub connection_id: ConnectionId,
    pub user_id: String,
}

/// Sent to the room after someone reloads, so clients can show a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReloadNoticeMsg {
    pub user_id: String,
    pub display_label: String,
}
