//! Daily limits: trade-count quota and realized-loss cap, both scoped
//! to the current UTC calendar day.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::trace;

use riskgate_collab::Storage;
use riskgate_core::{AccountId, Price};

use crate::config::RiskConfig;
use crate::stages::{Stage, StageReport};

/// Enforces per-day trade count and realized-loss limits.
pub struct DailyLimitsTracker;

impl DailyLimitsTracker {
    pub async fn check(
        config: &RiskConfig,
        account: &AccountId,
        day: NaiveDate,
        portfolio_value: Price,
        storage: &dyn Storage,
    ) -> StageReport {
        let mut report = StageReport::new(Stage::Limits);

        match storage.count_daily_trades(account, day).await {
            Ok(count) => {
                if count >= config.max_daily_trades {
                    report.limit(format!(
                        "Daily trade limit reached: {} of {}",
                        count, config.max_daily_trades
                    ));
                }
            }
            Err(err) => {
                report.fail_closed("Daily trade count", err);
                return report;
            }
        }

        match storage.find_daily_trades(account, day).await {
            Ok(trades) => {
                let net: Decimal = trades.iter().map(|t| t.realized_pnl).sum();
                if net < Decimal::ZERO && portfolio_value.is_positive() {
                    let loss_ratio = -net / portfolio_value.inner();
                    if loss_ratio > config.max_daily_loss {
                        report.limit(format!(
                            "Daily loss {} exceeds limit {} of portfolio",
                            loss_ratio, config.max_daily_loss
                        ));
                    }
                }
                trace!(net_pnl = %net, "daily limits stage evaluated");
            }
            Err(err) => report.fail_closed("Daily trade history", err),
        }

        report
    }
}
