//! Market environment checks. Every finding here is advisory: thin
//! books, closed sessions and anomalies raise warnings, never errors,
//! unless the data source itself is down.

use rust_decimal::Decimal;
use tracing::trace;

use riskgate_collab::MarketData;
use riskgate_core::Signal;

use crate::config::RiskConfig;
use crate::stages::{Stage, StageReport};

/// Snapshot of market conditions for the candidate symbol, captured for
/// scoring and telemetry.
#[derive(Debug, Clone, Default)]
pub struct MarketConditions {
    pub volatility: Decimal,
    pub liquidity: Decimal,
    pub closed: bool,
    pub anomalies: Vec<String>,
}

/// Samples market conditions and converts them into advisory warnings.
pub struct MarketRiskAssessor;

impl MarketRiskAssessor {
    /// Returns `None` for the snapshot when the market data source was
    /// unavailable; the report then carries the fail-closed error.
    pub async fn assess(
        config: &RiskConfig,
        signal: &Signal,
        market: &dyn MarketData,
    ) -> (StageReport, Option<MarketConditions>) {
        let mut report = StageReport::new(Stage::Market);

        let snapshot = async {
            Ok::<_, riskgate_collab::CollabError>(MarketConditions {
                volatility: market.estimate_volatility(&signal.symbol).await?,
                liquidity: market.estimate_liquidity(&signal.symbol).await?,
                closed: market.is_market_closed(&signal.symbol).await?,
                anomalies: market.detect_anomalies(&signal.symbol).await?,
            })
        }
        .await;

        let conditions = match snapshot {
            Ok(conditions) => conditions,
            Err(err) => {
                report.fail_closed("Market data", err);
                return (report, None);
            }
        };

        if conditions.volatility > config.volatility_limit {
            report.warn(format!(
                "Volatility {} above comfort limit {}",
                conditions.volatility, config.volatility_limit
            ));
        }
        if conditions.liquidity < config.liquidity_threshold {
            report.warn(format!(
                "Liquidity {} below threshold {}",
                conditions.liquidity, config.liquidity_threshold
            ));
        }
        if conditions.closed {
            report.warn(format!("Market for {} is closed", signal.symbol));
        }
        for anomaly in &conditions.anomalies {
            report.warn(format!("Market anomaly: {}", anomaly));
        }

        trace!(
            volatility = %conditions.volatility,
            liquidity = %conditions.liquidity,
            closed = conditions.closed,
            "market stage evaluated"
        );

        (report, Some(conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskgate_collab::{InMemoryMarketData, SymbolConditions};
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

    #[tokio::test]
    async fn test_calm_market_is_clean() {
        let market = InMemoryMarketData::new();
        let (report, conditions) =
            MarketRiskAssessor::assess(&RiskConfig::default(), &signal(), &market).await;
        assert!(report.is_clean());
        let conditions = conditions.unwrap();
        assert_eq!(conditions.volatility, dec!(0.02));
        assert!(!conditions.closed);
    }

    #[tokio::test]
    async fn test_stressed_market_warns_only() {
        let market = InMemoryMarketData::new();
        market.set_conditions(
            "BTC/USDT",
            SymbolConditions {
                volatility: dec!(0.30),
                liquidity: dec!(5000),
                closed: true,
                anomalies: vec!["price gap".to_string(), "spread spike".to_string()],
            },
        );

        let (report, conditions) =
            MarketRiskAssessor::assess(&RiskConfig::default(), &signal(), &market).await;
        assert!(!report.has_errors());
        // vol + liq + closed + 2 anomalies
        assert_eq!(report.warnings.len(), 5);
        assert_eq!(conditions.unwrap().anomalies.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_source_fails_closed() {
        let market = InMemoryMarketData::new();
        market.set_unavailable(true);
        let (report, conditions) =
            MarketRiskAssessor::assess(&RiskConfig::default(), &signal(), &market).await;
        assert!(report.has_errors());
        assert!(conditions.is_none());
    }
}
