//! Drawdown protection: measure the account's retreat from its peak
//! value and escalate to the circuit breaker when it crosses the trip
//! threshold.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use riskgate_collab::Storage;
use riskgate_core::{AccountId, Price};

use crate::config::RiskConfig;
use crate::stages::{Stage, StageReport};

/// What the drawdown check concluded beyond its report.
#[derive(Debug, Clone, Default)]
pub struct DrawdownOutcome {
    /// Current drawdown ratio in [0, 1]. Zero when at or above peak.
    pub drawdown: Decimal,
    /// Set when the drawdown crossed the breaker trip threshold. The
    /// caller owns the breaker; this stage only raises the flag.
    pub trip_breaker: bool,
}

/// Compares current portfolio value against the stored peak.
pub struct DrawdownProtector;

impl DrawdownProtector {
    /// A new high-water mark is persisted back to storage before the
    /// drawdown is declared zero.
    pub async fn check(
        config: &RiskConfig,
        account: &AccountId,
        current: Price,
        storage: &dyn Storage,
    ) -> (StageReport, DrawdownOutcome) {
        let mut report = StageReport::new(Stage::Drawdown);
        let mut outcome = DrawdownOutcome::default();

        let state = match storage.get_account(account).await {
            Ok(state) => state,
            Err(err) => {
                report.fail_closed("Account lookup", err);
                return (report, outcome);
            }
        };

        if current >= state.peak_portfolio_value {
            if let Err(err) = storage.update_peak_value(account, current).await {
                report.fail_closed("Peak value update", err);
            }
            debug!(account = %account, peak = %current, "new portfolio peak");
            return (report, outcome);
        }

        let drawdown = match current.drawdown_from(state.peak_portfolio_value) {
            Some(value) => value,
            None => return (report, outcome),
        };
        outcome.drawdown = drawdown;

        if drawdown > config.max_drawdown {
            report.limit(format!(
                "Drawdown {} exceeds maximum {}",
                drawdown, config.max_drawdown
            ));
        }
        if drawdown > config.circuit_breaker_threshold {
            warn!(account = %account, drawdown = %drawdown, "drawdown past breaker threshold");
            outcome.trip_breaker = true;
        }

        (report, outcome)
    }
}
