//! Position sizing: derive the maximum safe size from the stop distance
//! and the per-trade risk budget. Sizes only ever shrink.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use riskgate_core::{Price, Signal, Size};

use crate::config::RiskConfig;
use crate::stages::{Stage, StageReport};

/// Derives and enforces the maximum safe position size.
pub struct PositionSizer;

impl PositionSizer {
    /// Compute the sized amount for a signal.
    ///
    /// `max_size = (max_risk_per_trade * portfolio_value) /
    /// (stop_distance_ratio * entry_price)`, in base units.
    ///
    /// Returns the stage report and the final amount (the requested
    /// amount clamped down to `max_size`, or `max_size` itself when the
    /// signal carried no amount). The amount is `None` when sizing could
    /// not be performed.
    pub fn size(
        config: &RiskConfig,
        signal: &Signal,
        portfolio_value: Price,
    ) -> (StageReport, Option<Size>) {
        let mut report = StageReport::new(Stage::Sizing);

        if let Some(leverage) = signal.leverage {
            if leverage > config.max_leverage {
                report.limit(format!(
                    "Leverage {} exceeds limit {}",
                    leverage, config.max_leverage
                ));
            }
        }

        let stop_ratio = match signal.entry_price.stop_distance_ratio(signal.stop_loss) {
            Some(ratio) if ratio > Decimal::ZERO => ratio,
            _ => {
                report.limit("Stop distance is zero; cannot size position");
                return (report, None);
            }
        };

        let max_size =
            (config.max_risk_per_trade * portfolio_value.inner())
                / (stop_ratio * signal.entry_price.inner());

        let final_amount = match signal.amount {
            Some(requested) => {
                // Absolute ceiling on the original request, independent of
                // the exposure-ratio check upstream.
                let ceiling = portfolio_value.inner() * config.max_position_size;
                if requested.inner() > ceiling {
                    report.limit(format!(
                        "Requested amount {} exceeds absolute ceiling {}",
                        requested, ceiling
                    ));
                }

                if requested.inner() > max_size {
                    let clamped = Size::new(max_size);
                    report.warn(format!(
                        "Position size reduced from {} to {} by risk budget",
                        requested, clamped
                    ));
                    debug!(requested = %requested, clamped = %clamped, "position size clamped");
                    clamped
                } else {
                    requested
                }
            }
            None => Size::new(max_size),
        };

        // Absolute floor in quote currency.
        let final_notional = final_amount.notional(signal.entry_price);
        if final_notional < config.min_order_value {
            report.limit(format!(
                "Order notional {} below minimum {}",
                final_notional, config.min_order_value
            ));
        }

        trace!(max_size = %max_size, final_amount = %final_amount, "sizing stage evaluated");

        (report, Some(final_amount))
    }
}
