// src/main.rs
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use micropolls::config::Config;
use micropolls::db::PgStore;
use micropolls::poll::PollService;
use micropolls::routes;
use micropolls::store::{MemoryStore, SharedStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("micropolls=info,tower_http=info")),
        )
        .init();

    let config = Config::load()?;

    let store: SharedStore = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url, config.max_connections).await?),
        None => Arc::new(MemoryStore::new()),
    };

    let service = PollService::new(store.clone(), config.admin_key.clone(), config.request_timeout);
    let app = routes::create_routes(service, &config.allowed_origins);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("MicroPolls server running on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
