use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::config::SinkKind;
use crate::room_manager::RoomStats;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Open WebSocket connections, including ones not yet in a room.
    pub connections: usize,
    pub rooms: RoomStats,
    pub results_sink: SinkKind,
}

/// Liveness plus a snapshot of room occupancy.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.ws_connection_count.load(Ordering::Relaxed);
    let rooms = state.rooms.read().await.stats();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections,
        rooms,
        results_sink: state.config.results.sink,
    })
}
