//! services/api/src/bin/api.rs

use api_lib::{
    adapters::DbAdapter,
    config::{Config, StoreBackend},
    error::ApiError,
    seed::seed_catalog,
    web::{self, AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use study_shield_core::{Clock, EntityStore, InMemoryStore, InactivityMonitor, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose the Entity Store ---
    let store: Arc<dyn EntityStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if config.seed_data {
        seed_catalog(store.as_ref()).await?;
    }

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(store.clone(), clock.clone(), config.clone()));

    // --- 4. Spawn the Inactivity Monitor ---
    let monitor_cancel = CancellationToken::new();
    let monitor = InactivityMonitor::new(store, clock)
        .with_interval(config.monitor_interval)
        .with_heartbeat_timeout(config.heartbeat_timeout);
    let monitor_handle = tokio::spawn(monitor.run(monitor_cancel.clone()));

    // --- 5. Create the Web Router ---
    let app = web::router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 7. Stop Background Work ---
    monitor_cancel.cancel();
    if tokio::time::timeout(Duration::from_secs(5), monitor_handle)
        .await
        .is_err()
    {
        warn!("Inactivity monitor did not stop within 5s");
    }
    info!("Graceful shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, starting graceful shutdown");
}
