//! Risk gate daemon skeleton.
//!
//! Runs the engine with in-memory collaborators and the background
//! monitors. Production deployments embed `RiskEngine` as a library and
//! supply real `Storage`/`MarketData`/`ThreatFeed` implementations; this
//! binary exists to exercise the wiring end to end.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use riskgate_collab::{InMemoryMarketData, InMemoryStorage, InMemoryThreatFeed, LogAlertSink};
use riskgate_engine::{EngineConfig, RiskEngine};
use riskgate_monitor::CounterProbe;

#[tokio::main]
async fn main() -> Result<()> {
    riskgate_telemetry::init_logging()?;

    info!("Starting riskgate v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load()?;
    info!(
        max_daily_trades = config.risk.max_daily_trades,
        max_drawdown = %config.risk.max_drawdown,
        "Configuration loaded"
    );

    let engine = RiskEngine::new(
        config,
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryMarketData::new()),
        Arc::new(InMemoryThreatFeed::new()),
        Arc::new(LogAlertSink),
    );

    let monitors = engine.start_monitors(Arc::new(CounterProbe::new()));
    info!("Monitors running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    monitors.shutdown().await;

    Ok(())
}
