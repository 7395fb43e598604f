//! Market-data collaborator: volatility, liquidity, hours, anomalies,
//! correlation.
//!
//! Estimates are pluggable by contract. The engine never hardcodes market
//! statistics; an implementation that cannot produce an estimate must
//! return an error so the corresponding stage fails closed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::error::{CollabError, CollabResult};
use crate::BoxFuture;

/// Market-data contract consumed by the market and correlation stages.
pub trait MarketData: Send + Sync {
    /// Estimated volatility for a symbol, as a fraction (0.02 = 2%).
    fn estimate_volatility<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<Decimal>>;

    /// Estimated available liquidity for a symbol, in quote currency.
    fn estimate_liquidity<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<Decimal>>;

    /// Whether the market for a symbol is currently closed.
    fn is_market_closed<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<bool>>;

    /// Flagged anomalies for a symbol, empty when none.
    fn detect_anomalies<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<Vec<String>>>;

    /// Correlation coefficient between two symbols, in [-1, 1].
    fn correlation<'a>(
        &'a self,
        symbol_a: &'a str,
        symbol_b: &'a str,
    ) -> BoxFuture<'a, CollabResult<Decimal>>;
}

/// Per-symbol conditions for the in-memory implementation.
#[derive(Debug, Clone)]
pub struct SymbolConditions {
    pub volatility: Decimal,
    pub liquidity: Decimal,
    pub closed: bool,
    pub anomalies: Vec<String>,
}

impl Default for SymbolConditions {
    fn default() -> Self {
        Self {
            volatility: Decimal::new(2, 2),     // 0.02
            liquidity: Decimal::from(1_000_000),
            closed: false,
            anomalies: Vec::new(),
        }
    }
}

/// In-memory market data with configurable per-symbol conditions.
#[derive(Default)]
pub struct InMemoryMarketData {
    conditions: RwLock<HashMap<String, SymbolConditions>>,
    correlations: RwLock<HashMap<(String, String), Decimal>>,
    unavailable: AtomicBool,
    calls: AtomicU64,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_conditions(&self, symbol: &str, conditions: SymbolConditions) {
        self.conditions
            .write()
            .insert(symbol.to_string(), conditions);
    }

    /// Symmetric correlation between two symbols.
    pub fn set_correlation(&self, a: &str, b: &str, value: Decimal) {
        let mut correlations = self.correlations.write();
        correlations.insert((a.to_string(), b.to_string()), value);
        correlations.insert((b.to_string(), a.to_string()), value);
    }

    /// Make every subsequent call fail with `CollabError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Total number of market-data calls observed.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn guard(&self) -> CollabResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollabError::Unavailable("market data offline".to_string()));
        }
        Ok(())
    }

    fn conditions_for(&self, symbol: &str) -> SymbolConditions {
        self.conditions
            .read()
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }
}

impl MarketData for InMemoryMarketData {
    fn estimate_volatility<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<Decimal>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self.conditions_for(symbol).volatility)
        })
    }

    fn estimate_liquidity<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<Decimal>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self.conditions_for(symbol).liquidity)
        })
    }

    fn is_market_closed<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<bool>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self.conditions_for(symbol).closed)
        })
    }

    fn detect_anomalies<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, CollabResult<Vec<String>>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self.conditions_for(symbol).anomalies)
        })
    }

    fn correlation<'a>(
        &'a self,
        symbol_a: &'a str,
        symbol_b: &'a str,
    ) -> BoxFuture<'a, CollabResult<Decimal>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self
                .correlations
                .read()
                .get(&(symbol_a.to_string(), symbol_b.to_string()))
                .copied()
                .unwrap_or(Decimal::ZERO))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_default_conditions() {
        let market = InMemoryMarketData::new();
        let vol = market.estimate_volatility("BTC/USDT").await.unwrap();
        assert_eq!(vol, dec!(0.02));
        assert!(!market.is_market_closed("BTC/USDT").await.unwrap());
    }

    #[tokio::test]
    async fn test_configured_conditions() {
        let market = InMemoryMarketData::new();
        market.set_conditions(
            "DOGE/USDT",
            SymbolConditions {
                volatility: dec!(0.30),
                liquidity: dec!(500),
                closed: true,
                anomalies: vec!["price spike".to_string()],
            },
        );

        assert_eq!(
            market.estimate_volatility("DOGE/USDT").await.unwrap(),
            dec!(0.30)
        );
        assert!(market.is_market_closed("DOGE/USDT").await.unwrap());
        assert_eq!(
            market.detect_anomalies("DOGE/USDT").await.unwrap(),
            vec!["price spike".to_string()]
        );
    }

    #[tokio::test]
    async fn test_correlation_symmetric() {
        let market = InMemoryMarketData::new();
        market.set_correlation("BTC/USDT", "ETH/USDT", dec!(0.85));

        assert_eq!(
            market.correlation("BTC/USDT", "ETH/USDT").await.unwrap(),
            dec!(0.85)
        );
        assert_eq!(
            market.correlation("ETH/USDT", "BTC/USDT").await.unwrap(),
            dec!(0.85)
        );
        assert_eq!(
            market.correlation("BTC/USDT", "SOL/USDT").await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_unavailable_mode() {
        let market = InMemoryMarketData::new();
        market.set_unavailable(true);

        assert!(market.estimate_volatility("BTC/USDT").await.is_err());
    }
}
