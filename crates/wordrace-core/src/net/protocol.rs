use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, JoinMsg, MessageType, PageReloadNoticeMsg, PageReloadedMsg, ProgressMsg,
    ReadyMsg, ServerMessage, StartMsg, StartedMsg, WinnerMsg,
};
use crate::room::RoomView;

/// Maximum size of an inbound client frame in bytes. Outbound server
/// messages are not capped; a `state` view grows with the room.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// How a connection frames its messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Text frames, `{"event": ..., "data": ...}`.
    #[default]
    Json,
    /// Binary frames, one type byte then a MessagePack map.
    Msgpack,
}

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

// ---------------------------------------------------------------------------
// JSON text frames
// ---------------------------------------------------------------------------

/// Encode a `ServerMessage` as a JSON text frame.
pub fn encode_server_json(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Encode a `ClientMessage` as a JSON text frame.
pub fn encode_client_json(msg: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Decode a JSON text frame into a `ClientMessage`.
pub fn decode_client_json(text: &str) -> Result<ClientMessage, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }
    serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode a JSON text frame into a `ServerMessage`.
pub fn decode_server_json(text: &str) -> Result<ServerMessage, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

// ---------------------------------------------------------------------------
// MessagePack binary frames
// ---------------------------------------------------------------------------

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes = rmp_serde::to_vec_named(payload)
        .map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let mut buf = Vec::with_capacity(1 + payload_bytes.len());
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to binary wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::Join(m) => encode_message(MessageType::Join, m),
        ClientMessage::Start(m) => encode_message(MessageType::Start, m),
        ClientMessage::Progress(m) => encode_message(MessageType::Progress, m),
        ClientMessage::Ready(m) => encode_message(MessageType::Ready, m),
        ClientMessage::PageReloaded(m) => encode_message(MessageType::PageReloaded, m),
    }
}

/// Encode a `ServerMessage` to binary wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::State(m) => encode_message(MessageType::State, m),
        ServerMessage::Started(m) => encode_message(MessageType::Started, m),
        ServerMessage::Winner(m) => encode_message(MessageType::Winner, m),
        ServerMessage::PageReloaded(m) => encode_message(MessageType::PageReloadNotice, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw binary wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::Join => Ok(ClientMessage::Join(decode_payload::<JoinMsg>(data)?)),
        MessageType::Start => Ok(ClientMessage::Start(decode_payload::<StartMsg>(data)?)),
        MessageType::Progress => Ok(ClientMessage::Progress(decode_payload::<ProgressMsg>(
            data,
        )?)),
        MessageType::Ready => Ok(ClientMessage::Ready(decode_payload::<ReadyMsg>(data)?)),
        MessageType::PageReloaded => Ok(ClientMessage::PageReloaded(decode_payload::<
            PageReloadedMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw binary wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::State => Ok(ServerMessage::State(decode_payload::<RoomView>(data)?)),
        MessageType::Started => Ok(ServerMessage::Started(decode_payload::<StartedMsg>(data)?)),
        MessageType::Winner => Ok(ServerMessage::Winner(decode_payload::<WinnerMsg>(data)?)),
        MessageType::PageReloadNotice => Ok(ServerMessage::PageReloaded(decode_payload::<
            PageReloadNoticeMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerView;

    fn test_view() -> RoomView {
        RoomView {
            room_id: "room-1".into(),
            quiz_subject_id: "dict-9".into(),
            mode: "classic".into(),
            started_at: None,
            item_order: vec![2, 0, 1],
            players: vec![PlayerView {
                connection_id: 4,
                user_id: "u4".into(),
                display_label: "dana@example.com".into(),
                progress_index: 1,
                correct_count: 1,
                finished: false,
                ready: true,
            }],
        }
    }

    #[test]
    fn decode_join_json_from_browser_shape() {
        let text = r#"{"event":"join","data":{"roomId":"r1","userId":"42","displayLabel":"a@b.c","quizSubjectId":"7","mode":"classic","itemOrder":[3,1,2]}}"#;
        match decode_client_json(text).unwrap() {
            ClientMessage::Join(j) => {
                assert_eq!(j.room_id, "r1");
                assert_eq!(j.user_id, "42");
                assert_eq!(j.item_order, Some(vec![3, 1, 2]));
            },
            other => panic!("Expected Join, got: {other:?}"),
        }
    }

    #[test]
    fn progress_json_finished_is_optional() {
        let text = r#"{"event":"progress","data":{"roomId":"r1","progressIndex":3,"correctCount":2}}"#;
        match decode_client_json(text).unwrap() {
            ClientMessage::Progress(p) => {
                assert_eq!(p.progress_index, 3);
                assert_eq!(p.finished, None);
            },
            other => panic!("Expected Progress, got: {other:?}"),
        }
    }

    #[test]
    fn page_reloaded_event_name_is_camel_case() {
        let text = r#"{"event":"pageReloaded","data":{"roomId":"r","userId":"u","displayLabel":"U"}}"#;
        assert!(matches!(
            decode_client_json(text).unwrap(),
            ClientMessage::PageReloaded(_)
        ));
    }

    #[test]
    fn unknown_json_event_rejected() {
        let text = r#"{"event":"teleport","data":{"roomId":"r"}}"#;
        assert!(matches!(
            decode_client_json(text),
            Err(ProtocolError::DeserializeError(_))
        ));
        assert!(matches!(
            decode_client_json(""),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn state_json_uses_null_started_at() {
        let text = encode_server_json(&ServerMessage::State(test_view())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "state");
        assert!(value["data"]["startedAt"].is_null());
        assert_eq!(value["data"]["players"][0]["displayLabel"], "dana@example.com");
    }

    #[test]
    fn binary_state_roundtrip() {
        let msg = ServerMessage::State(test_view());
        let encoded = encode_server_message(&msg).unwrap();
        assert_eq!(encoded[0], MessageType::State as u8);
        assert_eq!(decode_server_message(&encoded).unwrap(), msg);
    }

    #[test]
    fn binary_progress_without_finished_decodes() {
        let msg = ClientMessage::Progress(ProgressMsg {
            room_id: "r".into(),
            progress_index: 5,
            correct_count: 4,
            finished: None,
        });
        let encoded = encode_client_message(&msg).unwrap();
        assert_eq!(decode_client_message(&encoded).unwrap(), msg);
    }

    #[test]
    fn server_type_byte_rejected_as_client_message() {
        let encoded = encode_server_message(&ServerMessage::Winner(WinnerMsg {
            room_id: "r".into(),
            connection_id: 1,
            user_id: "u".into(),
        }))
        .unwrap();
        assert!(matches!(
            decode_client_message(&encoded),
            Err(ProtocolError::UnknownMessageType(0x12))
        ));
    }

    #[test]
    fn unknown_type_byte_and_empty_frames() {
        assert!(matches!(
            decode_message_type(&[0xFF]),
            Err(ProtocolError::UnknownMessageType(0xFF))
        ));
        assert!(matches!(
            decode_client_message(&[]),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn oversized_binary_frame_rejected() {
        let data = vec![MessageType::Join as u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            decode_client_message(&data),
            Err(ProtocolError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn large_room_state_still_encodes() {
        let room = crate::test_helpers::make_room("big", 1000);
        let msg = ServerMessage::State(room.view());

        let text = encode_server_json(&msg).unwrap();
        assert!(text.len() > MAX_MESSAGE_SIZE);
        assert_eq!(decode_server_json(&text).unwrap(), msg);

        let encoded = encode_server_message(&msg).unwrap();
        assert!(encoded.len() > MAX_MESSAGE_SIZE);
        assert_eq!(decode_server_message(&encoded).unwrap(), msg);
    }

    #[test]
    fn wire_format_parses_lowercase() {
        #[derive(Deserialize)]
        struct Q {
            format: WireFormat,
        }
        let q: Q = serde_json::from_str(r#"{"format":"msgpack"}"#).unwrap();
        assert_eq!(q.format, WireFormat::Msgpack);
        assert_eq!(WireFormat::default(), WireFormat::Json);
    }
}
