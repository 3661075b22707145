//! Carestock - Backend Server
//!
//! Serves the caregiver API and runs the nightly shelf-life and activity
//! scheduling jobs.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carestock_backend::{create_app, jobs::scheduler, store::PgStore, AppState, Config, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing; production logs are JSON lines
    let json_logs = config.environment == "production";
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "carestock_server=debug,carestock_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .init();

    tracing::info!("Starting Carestock Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        "Facility offset: {} minutes from UTC",
        config.facility.utc_offset_minutes
    );

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool));

    // Start the daily jobs
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job_handles = if config.jobs.enabled {
        scheduler::spawn(store.clone(), &config, shutdown_rx)?
    } else {
        tracing::info!("Scheduled jobs disabled");
        Vec::new()
    };

    // Create application state
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the scheduler loops; a job in progress finishes first
    let _ = shutdown_tx.send(true);
    for handle in job_handles {
        let _ = handle.await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
