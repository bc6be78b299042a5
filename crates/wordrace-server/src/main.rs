use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use wordrace_server::config::ServerConfig;
use wordrace_server::sink::build_sink;
use wordrace_server::{build_app, spawn_idle_sweeper};

#[tokio::main]
async fn main() {
    init_tracing();

    tracing::info!("Wordrace server starting");

    let config = ServerConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    let sink = match build_sink(&config.results) {
        Ok(sink) => sink,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize result sink");
            std::process::exit(1);
        },
    };
    tracing::info!(sink = ?config.results.sink, "Result sink ready");

    let listen_addr = config.listen_addr.clone();
    let (app, state) = build_app(config, sink);
    spawn_idle_sweeper(state);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %listen_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        },
    };
    tracing::info!(addr = %listen_addr, "Listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;
    if let Err(e) = served {
        tracing::error!(error = %e, "Server error");
    }
    tracing::info!("Wordrace server stopped");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("WORDRACE_LOG_FORMAT").is_ok_and(|v| v == "json");
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
