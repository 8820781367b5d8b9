// Main entry point for API server

use std::time::Duration;

use anyhow::{Context, Result};
use laborhub_core::{server::build_app, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long queued SMS/push tasks get to finish after the server stops
const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,laborhub_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LaborHub recruiting API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Build application
    let (app, dispatch_worker) = build_app(&config, pool);
    let dispatch_handle = tokio::spawn(dispatch_worker.run());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router held the last queue handle; the worker now drains and exits.
    tracing::info!("Server stopped, draining dispatch queue");
    match tokio::time::timeout(DISPATCH_DRAIN_TIMEOUT, dispatch_handle).await {
        Ok(Ok(())) => tracing::info!("Dispatch queue drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Dispatch worker panicked"),
        Err(_) => tracing::warn!("Dispatch queue not drained before timeout"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
