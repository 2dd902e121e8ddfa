//! Breakdown server binary
//!
//! Serves the breakdown ticket REST API backed by SQLite, with uploads on
//! local disk and an optional spreadsheet mirror.

use std::net::SocketAddr;

use breakdown::api::create_router;
use breakdown::app::{build_state, mirror_sink, router_options};
use breakdown::attachments::LocalBlobStore;
use breakdown::config::ServerConfig;
use breakdown::db::DatabaseConnection;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Loading server configuration...");
    let config = match ServerConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            return Err(format!(
                "Configuration required: {}. Set CONFIG_PATH or place config/breakdown-server.toml",
                e
            )
            .into());
        }
    };
    config.validate()?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Server name: {}", config.server.name);
    tracing::info!("Database Path: {}", config.database.path);
    tracing::info!("Upload directory: {}", config.uploads.dir.display());
    tracing::info!("Admin accounts: {}", config.admins.len());

    let addr: SocketAddr = format!("{}:{}", config.host(), config.port()?).parse()?;

    let database_url = config.database_url();
    tracing::info!("Connecting to database: {}", database_url);
    let db = DatabaseConnection::new(&database_url).await?;

    tracing::info!("Running database migrations");
    db.run_migrations().await?;
    db.health_check().await?;

    LocalBlobStore::new(config.uploads.dir.clone())
        .ensure_dir()
        .await?;

    let sink = mirror_sink(&config.mirror)?;
    let state = build_state(db.clone(), &config, sink);

    tracing::info!("Building API router");
    let app = create_router(state, &router_options(&config));

    tracing::info!("Starting breakdown server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Run server with graceful shutdown
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Breakdown server shut down gracefully");
    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL-C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down");
        }
    }
}
