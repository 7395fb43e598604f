//! The `RiskEngine` facade: one handle over the pipeline, the shared
//! context, the monitors and the operator surface.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use riskgate_collab::{AlertSink, MarketData, Storage, ThreatFeed};
use riskgate_core::{AccountId, AlertSeverity, Price, RiskAlert, RiskVerdict, Signal};
use riskgate_monitor::{MonitorHandles, ResourceProbe, RiskMonitorScheduler};
use riskgate_risk::stages::ResourceGovernor;
use riskgate_risk::{
    BreakerState, BreakerStatus, DailyMetrics, ResourceMetrics, RiskConfigPatch, RiskContext,
    SignalValidationPipeline,
};
use riskgate_telemetry::Metrics;

use crate::config::{EngineConfig, MonitorIntervals};
use crate::error::EngineResult;

/// How many alerts summaries carry.
const SUMMARY_ALERT_COUNT: usize = 20;

/// Point-in-time risk picture for one account.
#[derive(Debug, Clone, Serialize)]
pub struct RiskSummary {
    pub account_id: AccountId,
    /// Current drawdown from the stored peak.
    pub drawdown: Decimal,
    pub daily: DailyMetrics,
    pub daily_trade_limit: u64,
    pub breaker: BreakerStatus,
    pub resources: ResourceMetrics,
    pub failed_attempts: u32,
    pub suspicious_records: usize,
    pub recent_alerts: Vec<RiskAlert>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Engine health: degraded while the breaker is tripped or resources
/// are past their limits.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: HealthStatus,
    pub breaker: BreakerStatus,
    pub resources: ResourceMetrics,
    pub suspicious_records: usize,
    pub anomaly_records: usize,
}

/// Facade wiring config, collaborators, pipeline and monitors.
pub struct RiskEngine {
    ctx: Arc<RiskContext>,
    pipeline: SignalValidationPipeline,
    storage: Arc<dyn Storage>,
    monitors: MonitorIntervals,
}

impl RiskEngine {
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn Storage>,
        market: Arc<dyn MarketData>,
        threats: Arc<dyn ThreatFeed>,
        alert_sink: Arc<dyn AlertSink>,
    ) -> Self {
        let ctx = Arc::new(RiskContext::new(config.risk, alert_sink));
        let pipeline = SignalValidationPipeline::new(
            ctx.clone(),
            storage.clone(),
            market.clone(),
            threats.clone(),
        );
        Self {
            ctx,
            pipeline,
            storage,
            monitors: config.monitors,
        }
    }

    /// Shared context, for wiring outer layers (failed-attempt hooks,
    /// alert queries).
    pub fn context(&self) -> &Arc<RiskContext> {
        &self.ctx
    }

    /// Run the full validation pipeline for a signal and record metrics.
    ///
    /// Always returns a verdict, never an error: collaborator failures
    /// surface as fail-closed verdict errors.
    pub async fn validate_signal(
        &self,
        account: &AccountId,
        signal: &Signal,
        portfolio_value: Price,
    ) -> RiskVerdict {
        let started = Instant::now();
        let outcome = self
            .pipeline
            .validate_at(account, signal, portfolio_value, Utc::now())
            .await;
        let verdict = outcome.verdict;

        let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
        Metrics::validation(
            verdict.valid,
            verdict.risk_score.to_f64().unwrap_or(0.0),
            latency_ms,
        );
        for label in &outcome.error_stages {
            Metrics::stage_error(label);
        }
        Metrics::daily_trades(self.ctx.daily.read().trades);
        match self.ctx.breaker.state() {
            BreakerState::Tripped => Metrics::breaker_tripped("pipeline"),
            BreakerState::Armed => Metrics::breaker_armed(),
        }

        verdict
    }

    /// Aggregate the current risk picture for one account.
    ///
    /// Reads only; calling it twice without intervening mutation yields
    /// identical output.
    pub async fn risk_summary(&self, account: &AccountId) -> EngineResult<RiskSummary> {
        let state = self.storage.get_account(account).await?;
        let drawdown = state
            .portfolio_value
            .drawdown_from(state.peak_portfolio_value)
            .unwrap_or(Decimal::ZERO);

        let config = self.ctx.config();
        Ok(RiskSummary {
            account_id: account.clone(),
            drawdown,
            daily: self.ctx.daily.read().clone(),
            daily_trade_limit: config.max_daily_trades,
            breaker: self.ctx.breaker.status(),
            resources: self.ctx.resources.read().clone(),
            failed_attempts: self.ctx.failed_attempt_count(account),
            suspicious_records: self.ctx.threats.read().suspicious.len(),
            recent_alerts: self.ctx.recent_alerts(SUMMARY_ALERT_COUNT),
        })
    }

    /// Process health, independent of any account.
    pub fn health(&self) -> Health {
        let breaker = self.ctx.breaker.status();
        let resources = self.ctx.resources.read().clone();
        let config = self.ctx.config();
        let resource_report = ResourceGovernor::check(&config, &resources);

        let status = if breaker.state == BreakerState::Tripped || resource_report.has_errors() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };

        let threats = self.ctx.threats.read();
        Health {
            status,
            breaker,
            resources,
            suspicious_records: threats.suspicious.len(),
            anomaly_records: threats.anomalies.len(),
        }
    }

    /// Merge a partial config update into the live config.
    pub fn update_config(&self, patch: &RiskConfigPatch) {
        self.ctx.update_config(patch);
        info!("engine config updated");
    }

    /// Zero the daily counters outside the scheduled rollover.
    pub fn reset_daily_metrics(&self) {
        self.ctx.reset_daily(Utc::now());
        self.ctx.emit_alert(
            AlertSeverity::Info,
            "Daily metrics reset by operator",
            json!({}),
        );
    }

    /// Operator-initiated breaker trip.
    pub fn trip_breaker(&self, reason: &str) {
        self.ctx.trip_breaker(reason, Utc::now().timestamp_millis());
        Metrics::breaker_tripped(reason);
    }

    /// Operator-initiated breaker reset, ignoring the cooldown.
    pub fn reset_breaker(&self) {
        if self.ctx.breaker.force_reset() {
            Metrics::breaker_armed();
            self.ctx.emit_alert(
                AlertSeverity::Info,
                "Circuit breaker reset by operator",
                json!({}),
            );
        }
    }

    /// Spawn the background monitors.
    pub fn start_monitors(&self, probe: Arc<dyn ResourceProbe>) -> MonitorHandles {
        RiskMonitorScheduler::new(self.ctx.clone(), probe, self.monitors.into()).start()
    }
}
