mod config;
mod http;

use clap::Parser;
use config::Config;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use vault_core::{
    CommandService, ConnectionEngine, NoopEventBus, QueryService, RedbIdempotencyStore, RedbStore,
};
use vault_events::{EventBusStrategy, ReliableEventBus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!("Starting Vault server v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP: {}", config.http_addr);
    info!("Data: {:?}", config.db_path());

    info!("Opening database...");
    let storage = Arc::new(RedbStore::open(config.db_path())?);
    let stats = storage.stats()?;
    info!("Database loaded: {} nodes, {} edges", stats.node_count, stats.edge_count);

    let event_bus = Arc::new(ReliableEventBus::new(Box::new(NoopEventBus), EventBusStrategy::Log));
    let idempotency = Arc::new(RedbIdempotencyStore::new(storage.clone()));
    let connection_engine = ConnectionEngine::new(config.connection_config());

    let commands = Arc::new(
        CommandService::new(storage.clone(), event_bus.clone(), idempotency, connection_engine)
            .with_moderator(config.content_moderator()),
    );
    let queries = Arc::new(QueryService::new(storage.clone()));

    let app_state = http::AppState { commands, queries, start_time: Instant::now() };

    let app = http::create_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!("Vault server ready, listening on {}", config.http_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("HTTP server failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, terminating...");
        }
    }

    Ok(())
}
