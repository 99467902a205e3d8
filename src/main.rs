// =============================================================================
// Flow Tracker — Main Entry Point
// =============================================================================
//
// Polls CoinDCX futures market data on a fixed interval, classifies order
// flow and trend, optionally scans for a breakout setup, and serves the
// results over REST + WebSocket.
//
// The process refuses to start on an invalid configuration.  Once running,
// no upstream failure stops it.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod breakout;
mod coindcx;
mod error;
mod indicators;
mod market_data;
mod pipeline;
mod risk;
mod runtime_config;
mod scheduler;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::coindcx::CoinDcxClient;
use crate::market_data::MarketDataFetcher;
use crate::pipeline::Pipeline;
use crate::runtime_config::TrackerConfig;

const CONFIG_PATH: &str = "tracker_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Flow Tracker — Starting Up                        ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = TrackerConfig::load_or_default(CONFIG_PATH).map_err(|e| {
        error!(error = %e, "Unreadable configuration — refusing to start");
        e
    })?;

    // First run: leave an editable copy of the defaults behind.
    if !std::path::Path::new(CONFIG_PATH).exists() {
        if let Err(e) = config.save(CONFIG_PATH) {
            warn!(error = %e, "Failed to write default config");
        }
    }
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration — refusing to start");
        return Err(e).context("configuration validation failed");
    }
    let params = config.strategy_params()?;

    info!(
        pair = %config.pair,
        mode = %config.mode,
        direction = %config.direction,
        interval_secs = config.refresh_interval_secs,
        "Configuration accepted"
    );

    // ── 2. Market data access ────────────────────────────────────────────
    let client = CoinDcxClient::new(
        config.api_base_url.clone(),
        config.public_base_url.clone(),
        config.request_timeout(),
    )?;
    let feed = Arc::new(MarketDataFetcher::new(client, config.cache_ttls()));
    let pipeline = Pipeline::new(feed, params);

    // ── 3. Shared state & channels ───────────────────────────────────────
    let period = config.refresh_interval();
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (publisher, cycles) = scheduler::cycle_channel();

    // ── 4. Poll loop + state sink ────────────────────────────────────────
    let poll_handle = tokio::spawn(scheduler::run_poll_loop(
        pipeline,
        period,
        publisher,
        shutdown_rx.clone(),
    ));
    let sink_handle = tokio::spawn(app_state::run_state_sink(state.clone(), cycles));

    // ── 5. API server ────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let mut server_shutdown = shutdown_rx;
    let server_handle = tokio::spawn(async move {
        let app = api::rest::router(state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");
    shutdown_tx.send_replace(true);

    match poll_handle.await {
        Ok(cycles) => info!(cycles, "Poll loop stopped"),
        Err(e) => error!(error = %e, "Poll loop task failed"),
    }
    if let Err(e) = sink_handle.await {
        error!(error = %e, "State sink task failed");
    }
    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "API server error"),
        Err(e) => error!(error = %e, "API server task failed"),
    }

    info!("Flow Tracker shut down complete.");
    Ok(())
}
