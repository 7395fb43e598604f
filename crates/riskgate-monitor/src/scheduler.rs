//! The monitor scheduler: four interval tasks over one shared context.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use riskgate_core::AlertSeverity;
use riskgate_risk::RiskContext;

use crate::probe::ResourceProbe;

/// Tick intervals for the four monitor tasks, in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub risk_check_ms: u64,
    pub resource_sample_ms: u64,
    pub threat_sweep_ms: u64,
    pub breaker_check_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            risk_check_ms: 5_000,
            resource_sample_ms: 1_000,
            threat_sweep_ms: 60_000,
            breaker_check_ms: 1_000,
        }
    }
}

/// Handles to the running monitor tasks.
pub struct MonitorHandles {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl MonitorHandles {
    /// Cancel all tasks and wait for them to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Spawns and owns the background monitor tasks.
pub struct RiskMonitorScheduler {
    ctx: Arc<RiskContext>,
    probe: Arc<dyn ResourceProbe>,
    config: SchedulerConfig,
}

impl RiskMonitorScheduler {
    pub fn new(
        ctx: Arc<RiskContext>,
        probe: Arc<dyn ResourceProbe>,
        config: SchedulerConfig,
    ) -> Self {
        Self { ctx, probe, config }
    }

    /// Spawn the four monitor tasks. They run until the returned handles
    /// are shut down.
    pub fn start(self) -> MonitorHandles {
        info!(
            risk_check_ms = self.config.risk_check_ms,
            resource_sample_ms = self.config.resource_sample_ms,
            threat_sweep_ms = self.config.threat_sweep_ms,
            breaker_check_ms = self.config.breaker_check_ms,
            "risk monitors started"
        );

        let token = CancellationToken::new();
        let mut handles = Vec::new();

        {
            let ctx = self.ctx.clone();
            let token = token.clone();
            let interval = self.config.risk_check_ms;
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(interval));
                let mut watch = RiskWatch::default();
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => risk_tick(&ctx, Utc::now(), &mut watch),
                    }
                }
            }));
        }

        {
            let ctx = self.ctx.clone();
            let probe = self.probe.clone();
            let token = token.clone();
            let interval = self.config.resource_sample_ms;
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(interval));
                let mut alerted = false;
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            resource_tick(&ctx, probe.as_ref(), Utc::now(), &mut alerted);
                        }
                    }
                }
            }));
        }

        {
            let ctx = self.ctx.clone();
            let token = token.clone();
            let interval = self.config.threat_sweep_ms;
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(interval));
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => threat_tick(&ctx, Utc::now()),
                    }
                }
            }));
        }

        {
            let ctx = self.ctx.clone();
            let token = token.clone();
            let interval = self.config.breaker_check_ms;
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(interval));
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            ctx.poll_breaker(Utc::now().timestamp_millis());
                        }
                    }
                }
            }));
        }

        MonitorHandles { token, handles }
    }
}

/// Crossing detection for the risk task, reset on each daily rollover.
#[derive(Debug, Default)]
struct RiskWatch {
    drawdown_alerted: bool,
    risk_alerted: bool,
}

/// One risk-check tick: roll the daily window on a UTC date change and
/// alert once per window when usage runs hot.
fn risk_tick(ctx: &RiskContext, now: DateTime<Utc>, watch: &mut RiskWatch) {
    let config = ctx.config();
    let daily = ctx.daily.read().clone();

    if daily.window_start.date_naive() != now.date_naive() {
        ctx.reset_daily(now);
        *watch = RiskWatch::default();
        ctx.emit_alert(
            AlertSeverity::Info,
            "Daily risk window rolled over",
            json!({ "previous_window_start": daily.window_start }),
        );
        return;
    }

    let drawdown_watermark = config.max_drawdown * Decimal::new(8, 1);
    if daily.max_drawdown > drawdown_watermark && !watch.drawdown_alerted {
        watch.drawdown_alerted = true;
        warn!(max_drawdown = %daily.max_drawdown, "drawdown approaching limit");
        ctx.emit_alert(
            AlertSeverity::Warning,
            "Observed drawdown above 80% of limit",
            json!({ "max_drawdown": daily.max_drawdown, "limit": config.max_drawdown }),
        );
    }

    let risk_watermark = config.max_risk_per_trade * Decimal::from(10);
    if daily.total_risk > risk_watermark && !watch.risk_alerted {
        watch.risk_alerted = true;
        ctx.emit_alert(
            AlertSeverity::High,
            "Aggregate daily risk running hot",
            json!({ "total_risk": daily.total_risk, "watermark": risk_watermark }),
        );
    }
}

/// One resource-sampler tick: publish the probe sample and alert on the
/// first tick that crosses 80% of any quota.
fn resource_tick(
    ctx: &RiskContext,
    probe: &dyn ResourceProbe,
    now: DateTime<Utc>,
    alerted: &mut bool,
) {
    let sample = probe.sample();
    let config = ctx.config();

    let eighty = Decimal::new(8, 1);
    let hot = sample.memory_ratio > config.max_memory_ratio * eighty
        || sample.cpu_ratio > config.max_cpu_ratio * eighty
        || sample.active_connections * 10 > config.max_connections * 8
        || sample.requests_per_minute * 10 > config.max_requests_per_minute * 8;

    {
        let mut resources = ctx.resources.write();
        resources.memory_ratio = sample.memory_ratio;
        resources.cpu_ratio = sample.cpu_ratio;
        resources.active_connections = sample.active_connections;
        resources.requests_per_minute = sample.requests_per_minute;
        resources.sampled_at = Some(now);
    }

    if hot && !*alerted {
        *alerted = true;
        ctx.emit_alert(
            AlertSeverity::Warning,
            "Resource usage above 80% of a quota",
            json!({
                "memory_ratio": sample.memory_ratio,
                "cpu_ratio": sample.cpu_ratio,
                "active_connections": sample.active_connections,
                "requests_per_minute": sample.requests_per_minute,
            }),
        );
    } else if !hot {
        *alerted = false;
    }
    debug!(memory = %sample.memory_ratio, cpu = %sample.cpu_ratio, "resource sample");
}

/// One threat-sweep tick: evict stale records and idle admission locks,
/// decay failed-attempt streaks for quiet accounts, and alert on a high
/// suspicious count.
fn threat_tick(ctx: &RiskContext, now: DateTime<Utc>) {
    let config = ctx.config();
    let lookback = Duration::seconds(config.threat_lookback_secs);

    let suspicious_count = {
        let mut threats = ctx.threats.write();
        threats.evict_older_than(now - lookback);
        threats.last_sweep = Some(now);
        threats.suspicious.len()
    };

    ctx.decay_failed_attempts(now, lookback);
    ctx.evict_idle_admission_locks();
    debug!(
        suspicious_count,
        admission_locks = ctx.admission_lock_count(),
        "threat sweep complete"
    );

    if suspicious_count > config.suspicious_alert_threshold {
        ctx.emit_alert(
            AlertSeverity::High,
            "Suspicious-activity volume above threshold",
            json!({
                "suspicious_count": suspicious_count,
                "threshold": config.suspicious_alert_threshold,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeSample, StaticProbe};
    use riskgate_collab::RecordingAlertSink;
    use riskgate_core::{AccountId, ThreatRecord};
    use riskgate_risk::RiskConfig;
    use rust_decimal_macros::dec;

    fn context() -> (Arc<RiskContext>, Arc<RecordingAlertSink>) {
        let sink = Arc::new(RecordingAlertSink::new());
        let ctx = Arc::new(RiskContext::new(RiskConfig::default(), sink.clone()));
        (ctx, sink)
    }

    #[test]
    fn test_daily_rollover_resets_window() {
        let (ctx, sink) = context();
        ctx.record_attempt();
        ctx.record_attempt();

        let tomorrow = ctx.daily.read().window_start + Duration::days(1);
        risk_tick(&ctx, tomorrow, &mut RiskWatch::default());

        assert_eq!(ctx.daily.read().trades, 0);
        assert_eq!(sink.count_with_severity(AlertSeverity::Info), 1);
    }

    #[test]
    fn test_same_day_tick_keeps_counters() {
        let (ctx, _) = context();
        ctx.record_attempt();
        let now = ctx.daily.read().window_start + Duration::hours(1);
        risk_tick(&ctx, now, &mut RiskWatch::default());
        assert_eq!(ctx.daily.read().trades, 1);
    }

    #[test]
    fn test_hot_drawdown_alerts_once_per_window() {
        let (ctx, sink) = context();
        ctx.observe_drawdown(dec!(0.09)); // limit 0.10, watermark 0.08

        let now = ctx.daily.read().window_start + Duration::hours(1);
        let mut watch = RiskWatch::default();
        risk_tick(&ctx, now, &mut watch);
        risk_tick(&ctx, now, &mut watch);

        assert_eq!(sink.count_with_severity(AlertSeverity::Warning), 1);
    }

    #[test]
    fn test_resource_tick_publishes_sample() {
        let (ctx, sink) = context();
        let probe = StaticProbe::new(ProbeSample {
            memory_ratio: dec!(0.5),
            cpu_ratio: dec!(0.2),
            active_connections: 10,
            requests_per_minute: 100,
        });

        let mut alerted = false;
        resource_tick(&ctx, &probe, Utc::now(), &mut alerted);

        let resources = ctx.resources.read().clone();
        assert_eq!(resources.memory_ratio, dec!(0.5));
        assert!(resources.sampled_at.is_some());
        assert!(!alerted);
        assert_eq!(sink.alerts().len(), 0);
    }

    #[test]
    fn test_hot_resources_alert_on_crossing_only() {
        let (ctx, sink) = context();
        // memory watermark = 0.85 * 0.8 = 0.68
        let probe = StaticProbe::new(ProbeSample {
            memory_ratio: dec!(0.70),
            ..ProbeSample::default()
        });

        let mut alerted = false;
        resource_tick(&ctx, &probe, Utc::now(), &mut alerted);
        resource_tick(&ctx, &probe, Utc::now(), &mut alerted);
        assert_eq!(sink.count_with_severity(AlertSeverity::Warning), 1);

        // Recovery re-arms the alert.
        probe.set(ProbeSample::default());
        resource_tick(&ctx, &probe, Utc::now(), &mut alerted);
        probe.set(ProbeSample {
            memory_ratio: dec!(0.70),
            ..ProbeSample::default()
        });
        resource_tick(&ctx, &probe, Utc::now(), &mut alerted);
        assert_eq!(sink.count_with_severity(AlertSeverity::Warning), 2);
    }

    #[test]
    fn test_threat_sweep_evicts_and_decays() {
        let (ctx, _) = context();
        let account = AccountId::new("acct-1");
        let now = Utc::now();

        ctx.threats.write().push_suspicious(ThreatRecord {
            account_id: account.clone(),
            description: "stale".to_string(),
            observed_at: now - Duration::hours(2),
        });
        ctx.threats.write().push_suspicious(ThreatRecord {
            account_id: account.clone(),
            description: "fresh".to_string(),
            observed_at: now - Duration::minutes(5),
        });
        ctx.record_failed_attempt(&account, now - Duration::hours(2));

        threat_tick(&ctx, now);

        let threats = ctx.threats.read().clone();
        assert_eq!(threats.suspicious.len(), 1);
        assert_eq!(threats.suspicious[0].description, "fresh");
        assert!(threats.last_sweep.is_some());
        assert_eq!(ctx.failed_attempt_count(&account), 0);
    }

    #[tokio::test]
    async fn test_hot_feed_raises_high_alert_on_sweep() {
        use riskgate_collab::{InMemoryMarketData, InMemoryStorage, InMemoryThreatFeed};
        use riskgate_core::{AccountState, Price, Side, Signal, Size};
        use riskgate_risk::SignalValidationPipeline;

        let sink = Arc::new(RecordingAlertSink::new());
        let mut config = RiskConfig::default();
        config.suspicious_alert_threshold = 2;
        let ctx = Arc::new(RiskContext::new(config, sink.clone()));

        let account = AccountId::new("acct-1");
        let storage = Arc::new(InMemoryStorage::new());
        storage.set_account_state(
            &account,
            AccountState {
                portfolio_value: Price::new(dec!(10000)),
                peak_portfolio_value: Price::new(dec!(10000)),
            },
        );
        let feed = Arc::new(InMemoryThreatFeed::new());
        for i in 0..3 {
            feed.add_suspicious(ThreatRecord {
                account_id: account.clone(),
                description: format!("burst of cancelled orders #{}", i),
                observed_at: Utc::now(),
            });
        }

        let pipeline = SignalValidationPipeline::new(
            ctx.clone(),
            storage,
            Arc::new(InMemoryMarketData::new()),
            feed,
        );
        let signal = Signal {
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            entry_price: Price::new(dec!(100)),
            stop_loss: Price::new(dec!(95)),
            take_profit: Price::new(dec!(110)),
            confidence: dec!(80),
            amount: Some(Size::new(dec!(10))),
            leverage: None,
            timestamp: None,
        };
        let verdict = pipeline
            .validate(&account, &signal, Price::new(dec!(10000)))
            .await;
        assert!(verdict.valid, "errors: {:?}", verdict.errors);

        // The request path mirrored the feed records; the sweep sees a
        // count above the threshold and escalates.
        threat_tick(&ctx, Utc::now());
        assert_eq!(sink.count_with_severity(AlertSeverity::High), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_task_resets_expired_cooldown() {
        use riskgate_risk::BreakerState;

        let (ctx, sink) = context();
        // Deadline lands in the past: the first task tick resets it.
        ctx.breaker.set_cooldown_ms(0);
        ctx.trip_breaker("test", Utc::now().timestamp_millis() - 1_000);
        assert_eq!(ctx.breaker.state(), BreakerState::Tripped);

        let scheduler = RiskMonitorScheduler::new(
            ctx.clone(),
            Arc::new(StaticProbe::default()),
            SchedulerConfig {
                breaker_check_ms: 50,
                ..SchedulerConfig::default()
            },
        );
        let handles = scheduler.start();
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        assert_eq!(ctx.breaker.state(), BreakerState::Armed);
        assert_eq!(sink.count_with_severity(AlertSeverity::Info), 1);
        handles.shutdown().await;
    }
}
