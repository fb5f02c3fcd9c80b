//! Cache Gateway - an HTTP front for a Redis-compatible store
//!
//! Exposes batch writes, point reads and pattern purges over one shared
//! store connection.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_gateway::api::create_router;
use cache_gateway::store::{self, StoreEndpoint};
use cache_gateway::{AppState, Config, KvStore};

/// Main entry point for the gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load `.env` and configuration from environment variables
/// 3. Open the single store connection (fatal on failure)
/// 4. Build the cache components and the Axum router
/// 5. Bind the listener; on failure disconnect the store and exit
/// 6. Serve until SIGINT/SIGTERM, then disconnect the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cache Gateway");

    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    let endpoint: StoreEndpoint = config
        .store_url
        .parse()
        .context("invalid store connection string")?;
    info!(
        "Configuration loaded: port={}, store={}, ttl={}s, scan_page_size={}, sweep_max_pages={}",
        config.server_port, endpoint, config.entry_ttl, config.scan_page_size, config.sweep_max_pages
    );

    let store = store::connect(&endpoint)
        .await
        .with_context(|| format!("could not connect to store at {}", endpoint))?;

    let state = AppState::from_config(store.clone(), &config)?;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            store.disconnect().await;
            return Err(e).context("listener failed to start");
        }
    };
    info!("Server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.disconnect().await;
    served.context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
