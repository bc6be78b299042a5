pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod room_manager;
pub mod sink;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use axum::middleware;
use tower_http::services::ServeDir;

use config::ServerConfig;
use sink::SharedResultSink;
use state::AppState;

/// Build the Axum router and application state from a config and the sink
/// finished results are written to.
pub fn build_app(config: ServerConfig, sink: SharedResultSink) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let state = AppState::new(config, sink);

    let api_routes = Router::new()
        .route("/rooms/{room_id}", axum::routing::get(api::get_room))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_bearer,
        ));

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(&web_root))
        .with_state(state.clone());

    (app, state)
}

/// Background task that evicts rooms whose players vanished without a
/// disconnect ever reaching the server.
pub fn spawn_idle_sweeper(state: AppState) {
    let interval = Duration::from_secs(state.config.rooms.idle_check_interval_secs);
    let max_idle = Duration::from_secs(state.config.rooms.idle_timeout_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = state.rooms.write().await.cleanup_idle_rooms(max_idle);
            if removed > 0 {
                tracing::info!(removed, "Idle room sweep");
            }
        }
    });
}
