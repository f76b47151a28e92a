mod error;
mod geolocation;
mod models;
mod notifier;
mod pipeline;
mod scrapers;
mod settings;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use error::RunError;
use geolocation::{GeolocationProvider, GoogleMapsClient};
use notifier::{DiscordNotifier, LogNotifier, Notifier};
use pipeline::{Pipeline, RunContext};
use scrapers::ArantesScraper;
use settings::Config;
use std::sync::Arc;
use storage::SqliteStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Rent Watcher");

    let cfg = Config::load()?;

    let store = SqliteStore::connect(&cfg.database_url)
        .await
        .context("Failed to initialize database")?;

    let notifier: Arc<dyn Notifier> = match cfg.discord() {
        Some((token, channel)) => Arc::new(
            DiscordNotifier::new(token, channel, &cfg.arantes.base_url)
                .context("Failed to initialize Discord notifier")?,
        ),
        None => {
            warn!("Discord is not configured, new properties will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let scraper = ArantesScraper::new(cfg.arantes.clone())?;

    let mut pipeline =
        Pipeline::new(Arc::new(store), notifier).with_workers(cfg.arantes.parallelism);
    match cfg.geolocation_key() {
        Some(key) => {
            let provider: Arc<dyn GeolocationProvider> = Arc::new(GoogleMapsClient::new(key)?);
            pipeline = pipeline.with_geolocation(provider, cfg.destination_lat, cfg.destination_lng);
        }
        None => warn!("Google Maps API key not set, distances will not be calculated"),
    }

    let ctx = RunContext::new().with_deadline(cfg.run_timeout());
    tokio::spawn({
        let ctx = ctx.clone();
        async move {
            shutdown_signal().await;
            info!("Received termination signal. Initiating graceful shutdown...");
            ctx.cancel();
        }
    });

    match pipeline.crawl(&scraper, &ctx, cfg.arantes.max_pages).await {
        Ok(summary) => info!(
            pages = summary.pages_visited,
            inserted = summary.inserted,
            updated = summary.updated,
            failed = summary.failed,
            "✅ Crawl complete"
        ),
        Err(RunError::DeadlineExceeded) => warn!("Scraper timed out"),
        Err(RunError::Cancelled) => info!("Scraper was cancelled"),
    }

    info!("Scraping completed. Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
