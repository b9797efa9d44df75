//! quotelinker-server: quote submission API and landing page host.
//!
//! Configuration comes from the environment (and `.env`); see
//! `quotelinker_server::config` for the full list.

use std::sync::Arc;

use anyhow::{Context, Result};
use quotelinker_server::config::mask_database_url;
use quotelinker_server::{
    build_router, AppState, LeadStore, PgLeadStore, ServerConfig, SideEffects,
    SubmissionOrchestrator,
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,quotelinker_server=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    tracing::info!(
        url = %mask_database_url(&config.database.url),
        max_connections = config.database.max_connections,
        "Connecting to database"
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    let pg = PgLeadStore::new(pool);
    pg.migrate().await?;
    let store: Arc<dyn LeadStore> = Arc::new(pg);

    let client = reqwest::Client::builder()
        .timeout(config.outbound_timeout)
        .build()
        .context("Failed to build outbound HTTP client")?;
    let effects = SideEffects::from_config(&config, client)?;

    let integrations = config.integrations();
    tracing::info!(?integrations, "Integrations");

    let state = AppState {
        orchestrator: SubmissionOrchestrator::new(Arc::clone(&store), effects.clone()),
        store,
        integrations,
    };
    let app = build_router(state, config.static_dir.as_deref());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("quotelinker-server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    effects.drain().await;
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
