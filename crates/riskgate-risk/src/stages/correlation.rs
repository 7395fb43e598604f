//! Correlation exposure: flags when the candidate signal stacks risk
//! onto instruments the book already holds, directly or via correlated
//! symbols.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::trace;

use riskgate_collab::MarketData;
use riskgate_core::{base_of, Position, Signal};

use crate::config::RiskConfig;
use crate::stages::{Stage, StageReport};

/// Checks the candidate against existing positions for overlapping and
/// correlated exposure.
pub struct CorrelationRiskAssessor;

impl CorrelationRiskAssessor {
    /// Overlap is counted by base instrument, so "BTC/USDT" and
    /// "BTC-PERP" collide. Any overlap warns; three or more overlapping
    /// positions is a blocking error. Statistical correlation is then
    /// queried per distinct position symbol and warned above the
    /// configured limit.
    pub async fn assess(
        config: &RiskConfig,
        signal: &Signal,
        positions: &[Position],
        market: &dyn MarketData,
    ) -> StageReport {
        let mut report = StageReport::new(Stage::Correlation);

        let base = signal.base_instrument();
        let overlapping = positions
            .iter()
            .filter(|p| base_of(&p.symbol) == base)
            .count();

        if overlapping >= 3 {
            report.limit(format!(
                "{} overlapping positions in {}; correlated exposure too high",
                overlapping, base
            ));
        } else if overlapping > 0 {
            report.warn(format!(
                "{} existing position(s) already expose {}",
                overlapping, base
            ));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for position in positions {
            if position.symbol == signal.symbol || !seen.insert(position.symbol.as_str()) {
                continue;
            }
            match market.correlation(&signal.symbol, &position.symbol).await {
                Ok(corr) => {
                    if corr.abs() > config.correlation_limit {
                        report.warn(format!(
                            "High correlation {} between {} and {}",
                            corr, signal.symbol, position.symbol
                        ));
                    }
                }
                Err(err) => {
                    report.fail_closed("Correlation data", err);
                    break;
                }
            }
        }

        trace!(
            overlapping,
            warnings = report.warnings.len(),
            "correlation stage evaluated"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use riskgate_collab::InMemoryMarketData;
    use riskgate_core::{Price, Side, Size};
    use rust_decimal_macros::dec;

    fn signal() -> Signal {
        Signal {
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            entry_price: Price::new(dec!(100)),
            stop_loss: Price::new(dec!(95)),
            take_profit: Price::new(dec!(110)),
            confidence: dec!(80),
            amount: Some(Size::new(dec!(1))),
            leverage: None,
            timestamp: None,
        }
    }

    fn position(symbol: &str) -> Position {
        Position {
            symbol: symbol.to_string(),
            side: Side::Buy,
            size: Size::new(dec!(1)),
            entry_price: Price::new(dec!(100)),
            opened_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_book_is_clean() {
        let market = InMemoryMarketData::new();
        let report =
            CorrelationRiskAssessor::assess(&RiskConfig::default(), &signal(), &[], &market).await;
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_single_overlap_warns() {
        let market = InMemoryMarketData::new();
        let positions = vec![position("BTC-PERP")];
        let report =
            CorrelationRiskAssessor::assess(&RiskConfig::default(), &signal(), &positions, &market)
                .await;
        assert!(!report.has_errors());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("BTC"));
    }

    #[tokio::test]
    async fn test_three_overlaps_error() {
        let market = InMemoryMarketData::new();
        let positions = vec![
            position("BTC/USDT"),
            position("BTC-PERP"),
            position("BTC/USDC"),
        ];
        let report =
            CorrelationRiskAssessor::assess(&RiskConfig::default(), &signal(), &positions, &market)
                .await;
        assert!(report.has_errors());
    }

    #[tokio::test]
    async fn test_high_correlation_warns() {
        let market = InMemoryMarketData::new();
        market.set_correlation("BTC/USDT", "ETH/USDT", dec!(0.9));
        let positions = vec![position("ETH/USDT")];
        let report =
            CorrelationRiskAssessor::assess(&RiskConfig::default(), &signal(), &positions, &market)
                .await;
        assert!(!report.has_errors());
        assert!(report.warnings.iter().any(|w| w.contains("correlation")));
    }

    #[tokio::test]
    async fn test_negative_correlation_counts() {
        let market = InMemoryMarketData::new();
        market.set_correlation("BTC/USDT", "ETH/USDT", dec!(-0.85));
        let positions = vec![position("ETH/USDT")];
        let report =
            CorrelationRiskAssessor::assess(&RiskConfig::default(), &signal(), &positions, &market)
                .await;
        assert!(report.warnings.iter().any(|w| w.contains("correlation")));
    }

    #[tokio::test]
    async fn test_unavailable_market_fails_closed() {
        let market = InMemoryMarketData::new();
        market.set_unavailable(true);
        let positions = vec![position("ETH/USDT")];
        let report =
            CorrelationRiskAssessor::assess(&RiskConfig::default(), &signal(), &positions, &market)
                .await;
        assert!(report.has_errors());
        assert!(report.errors[0].to_string().contains("failing closed"));
    }
}
