//! Portfolio risk: exposure ratio, concurrent trades, per-trade risk,
//! concentration.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::trace;

use riskgate_core::{Position, Price, Signal};

use crate::config::RiskConfig;
use crate::stages::{Stage, StageReport};

/// Assesses a candidate signal against the account's open book.
pub struct PortfolioRiskAssessor;

impl PortfolioRiskAssessor {
    /// Run the portfolio checks.
    ///
    /// `portfolio_value` must be positive; the pipeline rejects other
    /// values before any stage runs. Returns the stage report and the
    /// candidate's per-trade risk fraction (for daily accounting).
    pub fn assess(
        config: &RiskConfig,
        signal: &Signal,
        positions: &[Position],
        portfolio_value: Price,
    ) -> (StageReport, Decimal) {
        let mut report = StageReport::new(Stage::Portfolio);
        let pv = portfolio_value.inner();

        // Exposure ratio across the open book.
        let total_exposure: Decimal = positions.iter().map(|p| p.notional()).sum();
        let exposure_ratio = total_exposure / pv;
        if exposure_ratio > config.max_position_size {
            report.limit(format!(
                "Exposure ratio {:.4} exceeds limit {}",
                exposure_ratio, config.max_position_size
            ));
        } else if exposure_ratio > config.max_position_size * Decimal::new(8, 1) {
            report.warn(format!(
                "Exposure ratio {:.4} above 80% of limit {}",
                exposure_ratio, config.max_position_size
            ));
        }

        // Concurrent trade count.
        if positions.len() >= config.max_concurrent_trades {
            report.limit(format!(
                "Open positions {} at concurrent-trade limit {}",
                positions.len(),
                config.max_concurrent_trades
            ));
        }

        // Per-trade risk of the candidate: stop distance ratio scaled by
        // the requested size relative to the portfolio. Sizing against
        // the risk budget happens downstream; this check only rejects
        // requests that dwarf the budget outright.
        let mut trade_risk = Decimal::ZERO;
        if let (Some(amount), Some(stop_ratio)) = (
            signal.amount,
            signal.entry_price.stop_distance_ratio(signal.stop_loss),
        ) {
            trade_risk = stop_ratio * amount.inner() / pv;
            if trade_risk > config.max_risk_per_trade {
                report.limit(format!(
                    "Per-trade risk {:.4} exceeds limit {}",
                    trade_risk, config.max_risk_per_trade
                ));
            }
        }

        // Concentration: largest single-instrument exposure (candidate
        // included) over total exposure (candidate included). Only
        // meaningful once the account holds positions.
        if !positions.is_empty() {
            let candidate_notional = signal
                .amount
                .map(|a| a.notional(signal.entry_price))
                .unwrap_or(Decimal::ZERO);
            let mut by_base: HashMap<&str, Decimal> = HashMap::new();
            for position in positions {
                *by_base.entry(position.base_instrument()).or_default() += position.notional();
            }
            *by_base.entry(signal.base_instrument()).or_default() += candidate_notional;

            let total = total_exposure + candidate_notional;
            if total > Decimal::ZERO {
                let largest = by_base.values().copied().max().unwrap_or(Decimal::ZERO);
                let concentration = largest / total;
                if concentration > config.concentration_warning {
                    report.warn(format!(
                        "Concentration {:.4} above {} threshold",
                        concentration, config.concentration_warning
                    ));
                }
            }
        }

        trace!(
            exposure_ratio = %exposure_ratio,
            open_positions = positions.len(),
            trade_risk = %trade_risk,
            "portfolio stage evaluated"
        );

        (report, trade_risk)
    }
}
