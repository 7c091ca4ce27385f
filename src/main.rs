//! Over/under prediction service
//!
//! Reads team season stats from a Google Sheet (one tab per league),
//! caches them in memory for the life of the process and serves
//! predictions over HTTP.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use over_under::config::Config;
use over_under::server::{router, AppState};
use over_under::{DatasetCache, GoogleSheetsClient, OverUnderService, SessionStore, TeamResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Local development only; deployments inject env vars / secret files.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("over_under=info".parse().context("invalid log directive")?),
        )
        .init();

    info!("Over/under service v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Spreadsheet {}, match cutoff {} ({}), fetch timeout {:?}",
        config.spreadsheet_id, config.match_cutoff, config.match_metric, config.fetch_timeout
    );

    let source = GoogleSheetsClient::new(
        config.sheets_base_url.clone(),
        config.spreadsheet_id.clone(),
        config.auth.clone(),
        config.requests_per_minute,
        config.fetch_timeout,
    )
    .context("Failed to create HTTP client")?;

    let service = OverUnderService::new(
        Arc::new(source),
        DatasetCache::new(),
        TeamResolver::new(config.match_cutoff, config.match_metric),
        config.fetch_timeout,
    );

    let sessions = SessionStore::new(config.session_idle, config.max_sessions);

    // Periodic sweep of idle sessions
    let sweeper = sessions.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let purged = sweeper.purge_idle().await;
            if purged > 0 {
                info!("Expired {} idle sessions", purged);
            }
        }
    });

    let app = router(AppState {
        service: Arc::new(service),
        sessions,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {:?}", e);
        }
        info!("Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    Ok(())
}
