//! Storage-facing account records: positions, trades, threat entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Size};
use crate::signal::Side;

/// Account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An open position as reported by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol, e.g. "BTC/USDT".
    pub symbol: String,
    /// Position direction.
    pub side: Side,
    /// Position size in base-asset quantity.
    pub size: Size,
    /// Average entry price.
    pub entry_price: Price,
    /// When the position was opened.
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Base instrument of the position's symbol.
    pub fn base_instrument(&self) -> &str {
        crate::signal::base_of(&self.symbol)
    }

    /// Notional exposure of this position at its entry price.
    pub fn notional(&self) -> Decimal {
        self.size.notional(self.entry_price)
    }
}

/// A closed trade as reported by storage, used for daily-loss accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Instrument symbol.
    pub symbol: String,
    /// Realized profit or loss in quote currency (negative = loss).
    pub realized_pnl: Decimal,
    /// When the trade closed.
    pub closed_at: DateTime<Utc>,
}

/// Account valuation snapshot from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    /// Current portfolio value.
    pub portfolio_value: Price,
    /// Highest portfolio value ever recorded for this account.
    pub peak_portfolio_value: Price,
}

/// A suspicious-activity or anomaly record from the threat feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRecord {
    /// Account the record applies to.
    pub account_id: AccountId,
    /// Short description of the observation.
    pub description: String,
    /// When the activity was observed.
    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_base_instrument() {
        let pos = Position {
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            size: Size::new(dec!(1000)),
            entry_price: Price::new(dec!(50000)),
            opened_at: Utc::now(),
        };
        assert_eq!(pos.base_instrument(), "BTC");
    }

    #[test]
    fn test_account_id_display() {
        let id = AccountId::from("acct-1");
        assert_eq!(id.to_string(), "acct-1");
        assert_eq!(id.as_str(), "acct-1");
    }
}
