use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use wordrace_core::net::messages::{ClientMessage, ServerMessage};
use wordrace_core::net::protocol::{
    decode_server_json, decode_server_message, encode_client_json, encode_client_message,
};
use wordrace_core::room::RoomView;

use wordrace_server::build_app;
use wordrace_server::config::{AuthFileConfig, ServerConfig};
use wordrace_server::sink::{MemoryResultSink, SharedResultSink};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub sink: Arc<MemoryResultSink>,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with no auth and an in-memory result sink.
    pub async fn new() -> Self {
        Self::from_parts(ServerConfig::default(), Arc::new(MemoryResultSink::new())).await
    }

    /// Start a test server whose REST API requires `token`.
    pub async fn with_auth(token: &str) -> Self {
        let config = ServerConfig {
            auth: AuthFileConfig {
                bearer_token: Some(token.to_string()),
            },
            ..ServerConfig::default()
        };
        Self::from_parts(config, Arc::new(MemoryResultSink::new())).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        Self::from_parts(config, Arc::new(MemoryResultSink::new())).await
    }

    pub async fn with_sink(sink: Arc<MemoryResultSink>) -> Self {
        Self::from_parts(ServerConfig::default(), sink).await
    }

    async fn from_parts(config: ServerConfig, sink: Arc<MemoryResultSink>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config, Arc::clone(&sink) as SharedResultSink);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            sink,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn ws_url_msgpack(&self) -> String {
        format!("ws://{}/ws?format=msgpack", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a client event as a JSON text frame.
pub async fn ws_send(stream: &mut WsStream, msg: &ClientMessage) {
    let text = encode_client_json(msg).unwrap();
    stream.send(Message::Text(text.into())).await.unwrap();
}

/// Send a client event as a MessagePack binary frame.
pub async fn ws_send_binary(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Send a raw text frame, bypassing the codec.
pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream
        .send(Message::Text(text.to_string().into()))
        .await
        .unwrap();
}

fn decode_frame(msg: Message) -> Option<ServerMessage> {
    match msg {
        Message::Text(text) => Some(decode_server_json(text.as_str()).unwrap()),
        Message::Binary(data) => Some(decode_server_message(&data).unwrap()),
        _ => None,
    }
}

/// Read the next server event in either wire format (5s timeout).
pub async fn ws_read(stream: &mut WsStream) -> ServerMessage {
    ws_try_read(stream, 5000)
        .await
        .expect("Timed out waiting for WebSocket message")
}

/// Try to read the next server event, returning None on timeout.
pub async fn ws_try_read(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(msg)) => {
                    if let Some(decoded) = decode_frame(msg) {
                        return decoded;
                    }
                },
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
            }
        }
    })
    .await
    .ok()
}

/// Read the next event and require it to be a `state` snapshot.
pub async fn ws_read_state(stream: &mut WsStream) -> RoomView {
    match ws_read(stream).await {
        ServerMessage::State(view) => view,
        other => panic!("Expected state, got: {other:?}"),
    }
}

/// Read events until nothing arrives for `quiet_ms`.
pub async fn ws_drain(stream: &mut WsStream, quiet_ms: u64) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Some(msg) = ws_try_read(stream, quiet_ms).await {
        out.push(msg);
    }
    out
}

pub fn count_winners(msgs: &[ServerMessage]) -> usize {
    msgs.iter()
        .filter(|m| matches!(m, ServerMessage::Winner(_)))
        .count()
}
