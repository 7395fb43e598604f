//! Trading signal types and structural validation.
//!
//! A `Signal` is a proposed trade as received from a strategy. It is
//! immutable; the pipeline produces an `AdjustedSignal` copy whose amount
//! may have been reduced (never enlarged) by the position sizer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Size};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A proposed trade, as produced by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Instrument symbol, e.g. "BTC/USDT".
    pub symbol: String,
    /// Trade direction.
    pub side: Side,
    /// Proposed entry price.
    pub entry_price: Price,
    /// Stop-loss price.
    pub stop_loss: Price,
    /// Take-profit price.
    pub take_profit: Price,
    /// Strategy confidence, 0-100.
    pub confidence: Decimal,
    /// Requested position size in base units, if any.
    #[serde(default)]
    pub amount: Option<Size>,
    /// Requested leverage, if any.
    #[serde(default)]
    pub leverage: Option<Decimal>,
    /// Signal creation time, if the strategy stamps it.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Signal {
    /// Structural validation: shape and internal consistency only.
    ///
    /// Returns the full list of structural problems so the caller sees
    /// everything wrong with a malformed signal at once. An empty list
    /// means the signal is structurally sound; it says nothing about risk.
    pub fn validate_structure(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut errors = Vec::new();

        if !is_valid_symbol(&self.symbol) {
            errors.push(format!("Invalid symbol format: '{}'", self.symbol));
        }

        if !self.entry_price.is_positive() {
            errors.push(format!("Entry price must be positive: {}", self.entry_price));
        }
        if !self.stop_loss.is_positive() {
            errors.push(format!("Stop-loss price must be positive: {}", self.stop_loss));
        }
        if !self.take_profit.is_positive() {
            errors.push(format!(
                "Take-profit price must be positive: {}",
                self.take_profit
            ));
        }

        if self.confidence < Decimal::ZERO || self.confidence > Decimal::from(100) {
            errors.push(format!(
                "Confidence out of range [0, 100]: {}",
                self.confidence
            ));
        }

        // Order consistency only makes sense once all prices are positive.
        if self.entry_price.is_positive()
            && self.stop_loss.is_positive()
            && self.take_profit.is_positive()
        {
            match self.side {
                Side::Buy => {
                    if self.stop_loss >= self.entry_price {
                        errors.push(format!(
                            "BUY stop-loss {} must be below entry {}",
                            self.stop_loss, self.entry_price
                        ));
                    }
                    if self.take_profit <= self.entry_price {
                        errors.push(format!(
                            "BUY take-profit {} must be above entry {}",
                            self.take_profit, self.entry_price
                        ));
                    }
                }
                Side::Sell => {
                    if self.stop_loss <= self.entry_price {
                        errors.push(format!(
                            "SELL stop-loss {} must be above entry {}",
                            self.stop_loss, self.entry_price
                        ));
                    }
                    if self.take_profit >= self.entry_price {
                        errors.push(format!(
                            "SELL take-profit {} must be below entry {}",
                            self.take_profit, self.entry_price
                        ));
                    }
                }
            }
        }

        if let Some(amount) = self.amount {
            if !amount.is_positive() {
                errors.push(format!("Requested amount must be positive: {}", amount));
            }
        }

        if let Some(leverage) = self.leverage {
            if leverage < Decimal::ONE {
                errors.push(format!("Leverage must be at least 1: {}", leverage));
            }
        }

        if let Some(ts) = self.timestamp {
            if ts > now {
                errors.push(format!("Signal timestamp {} is in the future", ts));
            }
        }

        errors
    }

    /// Base instrument of the symbol, e.g. "BTC" for "BTC/USDT".
    ///
    /// Symbols without a separator are returned whole.
    pub fn base_instrument(&self) -> &str {
        base_of(&self.symbol)
    }
}

/// Base instrument of a symbol string.
pub fn base_of(symbol: &str) -> &str {
    symbol
        .split(['/', '-'])
        .next()
        .unwrap_or(symbol)
}

/// Symbol format: uppercase alphanumeric components, optionally joined
/// by a single '/' or '-' separator. Examples: "BTCUSDT", "BTC/USDT".
fn is_valid_symbol(symbol: &str) -> bool {
    if symbol.is_empty() || symbol.len() > 20 {
        return false;
    }
    let mut parts = 0;
    for part in symbol.split(['/', '-']) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts <= 2
}

/// A signal after gating: identical to the input except the amount may
/// have been reduced by the position sizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedSignal {
    /// The signal as it will be executed.
    pub signal: Signal,
    /// The originally requested amount, before any adjustment.
    pub requested_amount: Option<Size>,
}

impl AdjustedSignal {
    /// Create an adjusted copy of a signal with no adjustment applied yet.
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            requested_amount: signal.amount,
            signal: signal.clone(),
        }
    }

    /// Shrink the amount to `new_amount`.
    ///
    /// Enlarging is a no-op: the adjusted amount can never exceed what
    /// the strategy originally requested.
    pub fn shrink_amount(&mut self, new_amount: Size) {
        match self.signal.amount {
            Some(current) if new_amount < current => {
                self.signal.amount = Some(new_amount);
            }
            None => {
                self.signal.amount = Some(new_amount);
            }
            _ => {}
        }
    }

    /// The effective amount after adjustment.
    pub fn amount(&self) -> Option<Size> {
        self.signal.amount
    }
}
