//! Shared engine state.
//!
//! `RiskContext` is the explicit context object injected into both the
//! request path and the monitor tasks. Each shared structure carries its
//! own lock so a slow stage never blocks unrelated reads; no lock is held
//! across an await point.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use riskgate_collab::AlertSink;
use riskgate_core::{AccountId, AlertLog, AlertSeverity, RiskAlert, ThreatRecord};

use crate::breaker::{BreakerPoll, CircuitBreaker};
use crate::config::RiskConfig;

/// Bound on retained threat/anomaly records.
const THREAT_RECORD_CAP: usize = 1_000;

/// Per-process daily counters.
///
/// Counters are monotonically non-decreasing within a window; only the
/// daily reset (scheduled or explicit) zeroes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetrics {
    /// Signals that passed structural validation (attempted accounting).
    pub trades: u64,
    /// Aggregate per-trade risk fractions for the window.
    pub total_risk: Decimal,
    /// Realized PnL observed for the window.
    pub realized_pnl: Decimal,
    /// Unrealized PnL observed for the window.
    pub unrealized_pnl: Decimal,
    /// Running maximum drawdown observed across accounts.
    pub max_drawdown: Decimal,
    /// Window start.
    pub window_start: DateTime<Utc>,
}

impl DailyMetrics {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            trades: 0,
            total_risk: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            window_start: now,
        }
    }

    /// Reset the window counters. Nothing else is touched.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Self::new(now);
    }
}

/// Most recent process resource sample. Written only by the sampler task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub memory_ratio: Decimal,
    pub cpu_ratio: Decimal,
    pub active_connections: u64,
    pub requests_per_minute: u64,
    /// When the sample was taken. `None` until the first sample lands.
    pub sampled_at: Option<DateTime<Utc>>,
}

impl Default for ResourceMetrics {
    fn default() -> Self {
        Self {
            memory_ratio: Decimal::ZERO,
            cpu_ratio: Decimal::ZERO,
            active_connections: 0,
            requests_per_minute: 0,
            sampled_at: None,
        }
    }
}

/// Bounded threat bookkeeping refreshed by the sweep task.
#[derive(Debug, Clone)]
pub struct ThreatMetrics {
    pub suspicious: VecDeque<ThreatRecord>,
    pub anomalies: VecDeque<ThreatRecord>,
    pub last_sweep: Option<DateTime<Utc>>,
}

impl Default for ThreatMetrics {
    fn default() -> Self {
        Self {
            suspicious: VecDeque::new(),
            anomalies: VecDeque::new(),
            last_sweep: None,
        }
    }
}

impl ThreatMetrics {
    pub fn push_suspicious(&mut self, record: ThreatRecord) {
        if self.suspicious.len() >= THREAT_RECORD_CAP {
            self.suspicious.pop_front();
        }
        self.suspicious.push_back(record);
    }

    pub fn push_anomaly(&mut self, record: ThreatRecord) {
        if self.anomalies.len() >= THREAT_RECORD_CAP {
            self.anomalies.pop_front();
        }
        self.anomalies.push_back(record);
    }

    /// Record a feed observation unless an identical record is already
    /// held. The request path replays the same feed records on every
    /// validation; only the first sighting counts.
    pub fn ingest_suspicious(&mut self, record: ThreatRecord) {
        if !self.suspicious.contains(&record) {
            self.push_suspicious(record);
        }
    }

    pub fn ingest_anomaly(&mut self, record: ThreatRecord) {
        if !self.anomalies.contains(&record) {
            self.push_anomaly(record);
        }
    }

    /// Drop records observed before the cutoff.
    pub fn evict_older_than(&mut self, cutoff: DateTime<Utc>) {
        self.suspicious.retain(|r| r.observed_at >= cutoff);
        self.anomalies.retain(|r| r.observed_at >= cutoff);
    }
}

#[derive(Debug, Clone)]
struct FailedAttempts {
    count: u32,
    last_failure: DateTime<Utc>,
}

/// Shared mutable state of the engine.
pub struct RiskContext {
    config: RwLock<RiskConfig>,
    pub breaker: CircuitBreaker,
    pub daily: RwLock<DailyMetrics>,
    pub resources: RwLock<ResourceMetrics>,
    pub threats: RwLock<ThreatMetrics>,
    pub alerts: AlertLog,
    failed_attempts: DashMap<AccountId, FailedAttempts>,
    admission: DashMap<AccountId, Arc<tokio::sync::Mutex<()>>>,
    alert_sink: Arc<dyn AlertSink>,
}

impl RiskContext {
    pub fn new(config: RiskConfig, alert_sink: Arc<dyn AlertSink>) -> Self {
        let breaker = CircuitBreaker::new(config.breaker_cooldown_ms);
        Self {
            config: RwLock::new(config),
            breaker,
            daily: RwLock::new(DailyMetrics::new(Utc::now())),
            resources: RwLock::new(ResourceMetrics::default()),
            threats: RwLock::new(ThreatMetrics::default()),
            alerts: AlertLog::default(),
            failed_attempts: DashMap::new(),
            admission: DashMap::new(),
            alert_sink,
        }
    }

    /// Snapshot of the current config.
    pub fn config(&self) -> RiskConfig {
        self.config.read().clone()
    }

    /// Replace config fields from a patch; breaker cooldown follows.
    pub fn update_config(&self, patch: &crate::config::RiskConfigPatch) {
        let mut config = self.config.write();
        patch.apply(&mut config);
        self.breaker.set_cooldown_ms(config.breaker_cooldown_ms);
        debug!("risk config updated");
    }

    /// Record an alert in the log and forward it to the sink.
    pub fn emit_alert(&self, severity: AlertSeverity, message: impl Into<String>, data: serde_json::Value) {
        let alert = RiskAlert::new(severity, message, data);
        self.alerts.push(alert.clone());
        self.alert_sink.publish(alert);
    }

    /// Trip the breaker, emitting a CRITICAL alert on the transition.
    pub fn trip_breaker(&self, reason: &str, now_ms: i64) {
        if self.breaker.trip(reason, now_ms) {
            self.emit_alert(
                AlertSeverity::Critical,
                format!("Circuit breaker tripped: {}", reason),
                json!({ "reason": reason, "tripped_at_ms": now_ms }),
            );
        }
    }

    /// Poll the breaker, emitting an INFO alert when this poll resets it.
    /// Returns true while the breaker is tripped.
    pub fn poll_breaker(&self, now_ms: i64) -> bool {
        match self.breaker.poll(now_ms) {
            BreakerPoll::Tripped => true,
            BreakerPoll::JustReset => {
                self.emit_alert(
                    AlertSeverity::Info,
                    "Circuit breaker reset after cooldown",
                    json!({ "reset_at_ms": now_ms }),
                );
                false
            }
            BreakerPoll::Armed => false,
        }
    }

    /// Count one attempted validation (post structural check).
    pub fn record_attempt(&self) {
        self.daily.write().trades += 1;
    }

    /// Accumulate a per-trade risk fraction into the window total.
    pub fn add_trade_risk(&self, risk: Decimal) {
        if risk > Decimal::ZERO {
            self.daily.write().total_risk += risk;
        }
    }

    /// Fold an observed drawdown into the running window maximum.
    pub fn observe_drawdown(&self, drawdown: Decimal) {
        let mut daily = self.daily.write();
        if drawdown > daily.max_drawdown {
            daily.max_drawdown = drawdown;
        }
    }

    /// Reset the daily window counters.
    pub fn reset_daily(&self, now: DateTime<Utc>) {
        self.daily.write().reset(now);
        debug!("daily metrics reset");
    }

    /// Record a failed attempt for an account (invalid verdicts,
    /// authentication failures reported by outer layers).
    pub fn record_failed_attempt(&self, account: &AccountId, now: DateTime<Utc>) {
        let mut entry = self
            .failed_attempts
            .entry(account.clone())
            .or_insert(FailedAttempts {
                count: 0,
                last_failure: now,
            });
        entry.count += 1;
        entry.last_failure = now;
    }

    /// Current failed-attempt count for an account.
    pub fn failed_attempt_count(&self, account: &AccountId) -> u32 {
        self.failed_attempts
            .get(account)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Decay failed-attempt counters for accounts that have been quiet
    /// for the full window; entries that reach zero are removed.
    pub fn decay_failed_attempts(&self, now: DateTime<Utc>, quiet_window: Duration) {
        self.failed_attempts.retain(|_, entry| {
            if now - entry.last_failure >= quiet_window {
                entry.count = entry.count.saturating_sub(1);
            }
            entry.count > 0
        });
    }

    /// Mirror threat-feed records seen on the request path into the
    /// shared store the sweep task sweeps and reports over.
    pub fn ingest_threats(
        &self,
        suspicious: Vec<ThreatRecord>,
        anomalies: Vec<ThreatRecord>,
    ) {
        if suspicious.is_empty() && anomalies.is_empty() {
            return;
        }
        let mut threats = self.threats.write();
        for record in suspicious {
            threats.ingest_suspicious(record);
        }
        for record in anomalies {
            threats.ingest_anomaly(record);
        }
    }

    /// Per-account admission lock serializing the read-check-admit window
    /// of concurrent validations for the same account.
    pub fn admission_lock(&self, account: &AccountId) -> Arc<tokio::sync::Mutex<()>> {
        self.admission
            .entry(account.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop admission locks no validation currently holds. Without this
    /// the map grows by one entry per account ever seen.
    pub fn evict_idle_admission_locks(&self) {
        self.admission.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of admission locks currently retained.
    pub fn admission_lock_count(&self) -> usize {
        self.admission.len()
    }

    /// The `n` most recent alerts.
    pub fn recent_alerts(&self, n: usize) -> Vec<RiskAlert> {
        self.alerts.recent(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskgate_collab::RecordingAlertSink;
    use rust_decimal_macros::dec;

    fn context() -> (Arc<RiskContext>, Arc<RecordingAlertSink>) {
        let sink = Arc::new(RecordingAlertSink::new());
        let ctx = Arc::new(RiskContext::new(
            RiskConfig::default(),
            sink.clone() as Arc<dyn AlertSink>,
        ));
        (ctx, sink)
    }

    #[test]
    fn test_trip_emits_critical_alert_once() {
        let (ctx, sink) = context();
        ctx.trip_breaker("drawdown", 100);
        ctx.trip_breaker("again", 200);

        assert_eq!(sink.count_with_severity(AlertSeverity::Critical), 1);
        assert_eq!(ctx.alerts.len(), 1);
    }

    #[test]
    fn test_poll_emits_info_alert_on_reset() {
        let (ctx, sink) = context();
        let cooldown = ctx.config().breaker_cooldown_ms;
        ctx.trip_breaker("drawdown", 0);

        assert!(ctx.poll_breaker(cooldown - 1));
        assert!(!ctx.poll_breaker(cooldown + 1));
        assert_eq!(sink.count_with_severity(AlertSeverity::Info), 1);
    }

    #[test]
    fn test_daily_counters() {
        let (ctx, _) = context();
        ctx.record_attempt();
        ctx.record_attempt();
        ctx.add_trade_risk(dec!(0.02));
        ctx.observe_drawdown(dec!(0.05));
        ctx.observe_drawdown(dec!(0.03));

        let daily = ctx.daily.read();
        assert_eq!(daily.trades, 2);
        assert_eq!(daily.total_risk, dec!(0.02));
        assert_eq!(daily.max_drawdown, dec!(0.05));
    }

    #[test]
    fn test_daily_reset_zeroes_counters() {
        let (ctx, _) = context();
        ctx.record_attempt();
        ctx.add_trade_risk(dec!(0.02));

        let now = Utc::now();
        ctx.reset_daily(now);

        let daily = ctx.daily.read();
        assert_eq!(daily.trades, 0);
        assert_eq!(daily.total_risk, Decimal::ZERO);
        assert_eq!(daily.window_start, now);
    }

    #[test]
    fn test_failed_attempt_decay() {
        let (ctx, _) = context();
        let account = AccountId::from("acct-1");
        let t0 = Utc::now();

        ctx.record_failed_attempt(&account, t0);
        ctx.record_failed_attempt(&account, t0);
        assert_eq!(ctx.failed_attempt_count(&account), 2);

        // Quiet for the full window: decays one step per sweep.
        let later = t0 + Duration::hours(2);
        ctx.decay_failed_attempts(later, Duration::hours(1));
        assert_eq!(ctx.failed_attempt_count(&account), 1);
        ctx.decay_failed_attempts(later, Duration::hours(1));
        assert_eq!(ctx.failed_attempt_count(&account), 0);
    }

    #[test]
    fn test_ingest_threats_skips_duplicates() {
        let (ctx, _) = context();
        let record = ThreatRecord {
            account_id: AccountId::from("a"),
            description: "rapid-fire orders".to_string(),
            observed_at: Utc::now(),
        };

        ctx.ingest_threats(vec![record.clone()], Vec::new());
        ctx.ingest_threats(vec![record.clone()], vec![record.clone()]);

        let threats = ctx.threats.read();
        assert_eq!(threats.suspicious.len(), 1);
        assert_eq!(threats.anomalies.len(), 1);
    }

    #[test]
    fn test_idle_admission_locks_evicted_held_ones_kept() {
        let (ctx, _) = context();
        let busy = AccountId::from("busy");
        let idle = AccountId::from("idle");

        let held = ctx.admission_lock(&busy);
        drop(ctx.admission_lock(&idle));
        assert_eq!(ctx.admission_lock_count(), 2);

        ctx.evict_idle_admission_locks();
        assert_eq!(ctx.admission_lock_count(), 1);
        // The held lock survives and stays the same lock.
        assert!(Arc::ptr_eq(&held, &ctx.admission_lock(&busy)));

        drop(held);
        ctx.evict_idle_admission_locks();
        assert_eq!(ctx.admission_lock_count(), 0);
    }

    #[test]
    fn test_threat_metrics_eviction() {
        let mut threats = ThreatMetrics::default();
        let now = Utc::now();
        threats.push_suspicious(ThreatRecord {
            account_id: AccountId::from("a"),
            description: "old".to_string(),
            observed_at: now - Duration::hours(2),
        });
        threats.push_suspicious(ThreatRecord {
            account_id: AccountId::from("a"),
            description: "fresh".to_string(),
            observed_at: now,
        });

        threats.evict_older_than(now - Duration::hours(1));
        assert_eq!(threats.suspicious.len(), 1);
        assert_eq!(threats.suspicious[0].description, "fresh");
    }
}
