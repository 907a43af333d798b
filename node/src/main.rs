// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use echo_log::LogStore;
use echo_log_node::config::NodeConfig;
use echo_log_node::server::{build_router, SharedStore};
use echo_log_node::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    init_telemetry();

    let cfg = match NodeConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Initializing echo-log node with config: {:?}", cfg);

    let store: SharedStore = Arc::new(LogStore::open(cfg.store.clone()));
    let app = build_router(store.clone());

    let addr = cfg.bind_addr;
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    // Pending appends land before the process exits.
    if let Err(e) = store.shutdown().await {
        tracing::error!("Failed to shut down log store: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
