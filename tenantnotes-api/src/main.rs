//! # TenantNotes API Server
//!
//! Provisions the sharded schema on startup, then serves the JSON API.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... SESSION_SECRET=... cargo run -p tenantnotes-api
//! ```

use anyhow::Context;
use tenantnotes_api::{
    app::{build_router, AppState},
    config::Config,
};
use tenantnotes_shared::db::{
    pool::{close_pool, create_pool, PoolConfig},
    provision::ensure_schema,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tenantnotes_api=debug,tenantnotes_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TenantNotes API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(
        PoolConfig::new(config.database.url.clone())
            .with_max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to connect to database")?;

    // the server must not start on a half-provisioned schema
    let report = ensure_schema(&pool)
        .await
        .context("Failed to provision database schema")?;
    tracing::info!(
        registered = report.registered.len(),
        already_registered = report.already_registered.len(),
        "Schema provisioned"
    );

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
