//! Revocation Logger Binary
//!
//! Runs the revocation logger HTTP server.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use revocation_logger::{
    config, create_router, AppState, BucketStore, CaRelay, Engine, HttpCaClient, MemoryStore,
    Publisher,
};

#[tokio::main]
async fn main() {
    // Initialize logging
    let log_level = env::var("CT_LOGGER_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Configuration
    let config_path = env::var("CT_LOGGER_CONFIG").unwrap_or_else(|_| "logger/config.json".into());
    let ca_list_path = env::var("CT_LOGGER_CA_LIST").unwrap_or_else(|_| "logger/ca_list.json".into());
    let log_list_path =
        env::var("CT_LOGGER_LOG_LIST").unwrap_or_else(|_| "logger/log_list.json".into());

    let relay_timeout = env::var("CT_LOGGER_RELAY_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(revocation_logger::relay::DEFAULT_RELAY_TIMEOUT);

    let loaded = match config::load(&config_path, &ca_list_path, &log_list_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let bind_address = env::var("CT_LOGGER_BIND").unwrap_or_else(|_| loaded.bind_address.clone());

    // Initialize storage
    let store: Arc<dyn BucketStore> = Arc::new(MemoryStore::new());

    let engine = Engine::new(
        Arc::new(loaded.registry),
        Arc::clone(&store),
        Arc::new(loaded.identity),
    )
    .with_hash_algorithm(loaded.hash_algorithm);
    let publisher = Publisher::new(store, loaded.accepted_revocation_type);

    let client = match HttpCaClient::new(relay_timeout) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build CA client");
            std::process::exit(1);
        }
    };
    let relay = CaRelay::new(engine.clone(), Arc::new(client), relay_timeout);

    info!(
        log_id = %engine.identity().log_id(),
        ca_count = engine.registry().len(),
        hash_algorithm = %engine.hash_algorithm(),
        relay_timeout = ?relay_timeout,
        "Starting revocation logger"
    );

    // Create application state
    let state = Arc::new(AppState {
        engine,
        publisher,
        relay,
    });

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .expect("Failed to bind to address");

    info!(addr = %bind_address, "Revocation logger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Revocation logger stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining requests");
}
