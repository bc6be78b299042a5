use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use wordrace_core::net::messages::{ClientMessage, ServerMessage};
use wordrace_core::net::protocol::{
    MAX_MESSAGE_SIZE, ProtocolError, WireFormat, decode_client_json, decode_client_message,
    encode_server_json, encode_server_message,
};
use wordrace_core::player::ConnectionId;

use crate::state::{AppState, ConnectionGuard};

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub format: WireFormat,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let max_ws = state.config.limits.max_ws_connections;
    let Some(guard) = ConnectionGuard::try_acquire(&state.ws_connection_count, max_ws) else {
        tracing::warn!(max = max_ws, "WS connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, params.format, guard))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    format: WireFormat,
    _guard: ConnectionGuard,
) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel(state.config.limits.player_message_buffer);

    let connection_id = state.rooms.write().await.connect(tx);
    tracing::info!(connection_id, ?format, "Connection opened");

    spawn_writer(ws_sender, rx, format, connection_id);

    read_loop(&mut ws_receiver, &state, connection_id).await;

    // Dropping the registered sender here also ends the writer task.
    state.rooms.write().await.disconnect(connection_id);
    tracing::info!(connection_id, "Connection closed");
}

fn spawn_writer(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<ServerMessage>>,
    format: WireFormat,
    connection_id: ConnectionId,
) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let frame = match encode_frame(&msg, format) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(connection_id, error = %e, "Failed to encode message");
                    continue;
                },
            };
            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
    });
}

fn encode_frame(msg: &ServerMessage, format: WireFormat) -> Result<Message, ProtocolError> {
    match format {
        WireFormat::Json => Ok(Message::Text(encode_server_json(msg)?.into())),
        WireFormat::Msgpack => Ok(Message::Binary(encode_server_message(msg)?.into())),
    }
}

/// Decode an inbound frame. Text frames are JSON and binary frames are
/// MessagePack regardless of the connection's outbound format.
fn decode_frame(msg: Message) -> Option<Result<ClientMessage, ProtocolError>> {
    match msg {
        Message::Text(text) => Some(decode_client_json(text.as_str())),
        Message::Binary(data) => Some(decode_client_message(&data)),
        _ => None,
    }
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

fn is_finishing_tick(msg: &ClientMessage) -> bool {
    matches!(msg, ClientMessage::Progress(p) if p.finished == Some(true))
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    connection_id: ConnectionId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
        let Some(decoded) = decode_frame(msg) else {
            continue;
        };

        let client_msg = match decoded {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(connection_id, error = %e, "Dropping malformed frame");
                continue;
            },
        };

        // Rate limit: drop messages that exceed per-connection rate. A
        // finishing tick always goes through, or the room could never complete.
        if !rate_limiter.allow() && !is_finishing_tick(&client_msg) {
            tracing::warn!(connection_id, "Rate limited");
            continue;
        }

        let mut rooms = state.rooms.write().await;
        rooms.handle_message(connection_id, client_msg);
    }
}
