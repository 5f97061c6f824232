mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use hireprep_api::auth::{AppState, AppStateInner};
use hireprep_api::cleanup::sweep_resources;
use hireprep_api::router::build_router;
use hireprep_api::storage::ResourceStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hireprep=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and blob store
    let db = hireprep_db::Database::open(&config.db_path)?;
    let store = ResourceStore::new(config.media_root.clone()).await?;

    // Nothing is uploading yet, so every unmatched file is an orphan
    sweep_resources(&db, &store).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        store,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl_hours: config.token_ttl_hours,
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("HirePrep server listening on {}", addr);
    info!("Media root: {}", config.media_root.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(_) => {
                ctrl_c.await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
