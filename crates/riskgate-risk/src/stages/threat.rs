//! Threat gate: blocks accounts with a run of failed validations and
//! surfaces recent suspicious activity and behavioural anomalies from
//! the threat feed.

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use riskgate_collab::ThreatFeed;
use riskgate_core::{AccountId, ThreatRecord};

use crate::config::RiskConfig;
use crate::stages::{Stage, StageReport};

/// Feed records inside the lookback window, handed back so the caller
/// can mirror them into the shared threat metrics.
#[derive(Debug, Default)]
pub struct ThreatFindings {
    pub suspicious: Vec<ThreatRecord>,
    pub anomalies: Vec<ThreatRecord>,
}

pub struct ThreatGate;

impl ThreatGate {
    /// `failed_count` is the account's current failed-validation streak,
    /// tracked in `RiskContext`. Feed records older than the configured
    /// lookback are ignored.
    pub async fn assess(
        config: &RiskConfig,
        account: &AccountId,
        failed_count: u32,
        now: DateTime<Utc>,
        feed: &dyn ThreatFeed,
    ) -> (StageReport, ThreatFindings) {
        let mut report = StageReport::new(Stage::Threat);
        let mut findings = ThreatFindings::default();

        if failed_count >= config.max_failed_attempts {
            report.limit(format!(
                "Account blocked after {} failed validation attempts",
                failed_count
            ));
        }

        let cutoff = now - Duration::seconds(config.threat_lookback_secs);

        match feed.suspicious_activity(account).await {
            Ok(records) => {
                for record in records.into_iter().filter(|r| r.observed_at >= cutoff) {
                    report.warn(format!("Suspicious activity: {}", record.description));
                    findings.suspicious.push(record);
                }
            }
            Err(err) => {
                report.fail_closed("Threat feed", err);
                return (report, findings);
            }
        }

        match feed.anomalies(account).await {
            Ok(records) => {
                for record in records.into_iter().filter(|r| r.observed_at >= cutoff) {
                    report.warn(format!("Behavioural anomaly: {}", record.description));
                    findings.anomalies.push(record);
                }
            }
            Err(err) => report.fail_closed("Threat feed", err),
        }

        trace!(
            account = %account,
            failed_count,
            warnings = report.warnings.len(),
            "threat stage evaluated"
        );
        (report, findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskgate_collab::InMemoryThreatFeed;

    fn account() -> AccountId {
        AccountId::new("acct-1")
    }

    fn record(description: &str, age_secs: i64) -> ThreatRecord {
        ThreatRecord {
            account_id: account(),
            description: description.to_string(),
            observed_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn test_clean_account() {
        let feed = InMemoryThreatFeed::new();
        let (report, findings) =
            ThreatGate::assess(&RiskConfig::default(), &account(), 0, Utc::now(), &feed).await;
        assert!(report.is_clean());
        assert!(findings.suspicious.is_empty());
        assert!(findings.anomalies.is_empty());
    }

    #[tokio::test]
    async fn test_failed_attempt_streak_blocks() {
        let feed = InMemoryThreatFeed::new();
        let config = RiskConfig::default();

        let (report, _) =
            ThreatGate::assess(&config, &account(), config.max_failed_attempts, Utc::now(), &feed)
                .await;
        assert!(report.errors.iter().any(|e| e.to_string().contains("blocked")));
    }

    #[tokio::test]
    async fn test_streak_below_limit_passes() {
        let feed = InMemoryThreatFeed::new();
        let config = RiskConfig::default();

        let (report, _) = ThreatGate::assess(
            &config,
            &account(),
            config.max_failed_attempts - 1,
            Utc::now(),
            &feed,
        )
        .await;
        assert!(!report.has_errors());
    }

    #[tokio::test]
    async fn test_recent_records_warn_stale_ignored() {
        let feed = InMemoryThreatFeed::new();
        feed.add_suspicious(record("rapid-fire orders", 60));
        feed.add_suspicious(record("yesterday's noise", 7200));
        feed.add_anomaly(record("odd login pattern", 120));

        let (report, findings) =
            ThreatGate::assess(&RiskConfig::default(), &account(), 0, Utc::now(), &feed).await;
        assert!(!report.has_errors());
        assert_eq!(report.warnings.len(), 2);

        // Only the in-window records come back for mirroring.
        assert_eq!(findings.suspicious.len(), 1);
        assert_eq!(findings.suspicious[0].description, "rapid-fire orders");
        assert_eq!(findings.anomalies.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_feed_fails_closed() {
        let feed = InMemoryThreatFeed::new();
        feed.set_unavailable(true);
        let (report, findings) =
            ThreatGate::assess(&RiskConfig::default(), &account(), 0, Utc::now(), &feed).await;
        assert!(report.has_errors());
        assert!(report.errors[0].to_string().contains("failing closed"));
        assert!(findings.suspicious.is_empty());
    }
}
