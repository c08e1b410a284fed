use anyhow::Context;
use std::sync::Arc;
use tracing::info;

mod config;
mod db;
mod routes;

use config::ServerConfig;
use db::Database;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stepowl_server=info".parse()?),
        )
        .init();

    let config = ServerConfig::load()?;

    let db = Database::new(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("Failed to initialize database {}", config.database_url))?;

    let state = AppState { db: Arc::new(db) };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Inventory server listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
