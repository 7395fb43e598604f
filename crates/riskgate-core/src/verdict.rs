//! The pipeline's answer for a single signal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountId;
use crate::signal::{AdjustedSignal, Signal};

/// Verdict for one validated signal.
///
/// Warnings and errors are kept in the order the stages produced them.
/// `valid` is false exactly when at least one error was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// Whether the signal may proceed to execution.
    pub valid: bool,
    /// Advisory findings; never invalidate the signal.
    pub warnings: Vec<String>,
    /// Blocking findings.
    pub errors: Vec<String>,
    /// Composite risk score, clamped to [0, 100].
    pub risk_score: Decimal,
    /// The signal with any size adjustment applied.
    pub adjusted: AdjustedSignal,
    /// When validation ran.
    pub validated_at: DateTime<Utc>,
    /// Account the signal was validated for.
    pub account_id: AccountId,
    /// Unique id of this verdict.
    pub verdict_id: Uuid,
}

impl RiskVerdict {
    /// Start a verdict for a signal. Valid until an error is recorded.
    pub fn new(signal: &Signal, account_id: AccountId) -> Self {
        Self {
            valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
            risk_score: Decimal::ZERO,
            adjusted: AdjustedSignal::from_signal(signal),
            validated_at: Utc::now(),
            account_id,
            verdict_id: Uuid::new_v4(),
        }
    }

    /// Record an advisory warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a blocking error. Marks the verdict invalid.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.valid = false;
    }

    /// Absorb a batch of warnings and errors from one stage.
    pub fn absorb(&mut self, warnings: Vec<String>, errors: Vec<String>) {
        for w in warnings {
            self.warn(w);
        }
        for e in errors {
            self.error(e);
        }
    }

    /// Set the composite risk score, clamping to [0, 100].
    pub fn set_risk_score(&mut self, score: Decimal) {
        self.risk_score = score.clamp(Decimal::ZERO, Decimal::from(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Price, Size};
    use crate::signal::Side;
    use rust_decimal_macros::dec;

    fn signal() -> Signal {
        Signal {
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            entry_price: Price::new(dec!(100)),
            stop_loss: Price::new(dec!(95)),
            take_profit: Price::new(dec!(110)),
            confidence: dec!(80),
            amount: Some(Size::new(dec!(100))),
            leverage: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_warnings_never_invalidate() {
        let mut verdict = RiskVerdict::new(&signal(), AccountId::from("a"));
        verdict.warn("high exposure");
        verdict.warn("market closed");
        assert!(verdict.valid);
        assert_eq!(verdict.warnings.len(), 2);
    }

    #[test]
    fn test_error_invalidates() {
        let mut verdict = RiskVerdict::new(&signal(), AccountId::from("a"));
        verdict.error("limit breached");
        assert!(!verdict.valid);
    }

    #[test]
    fn test_score_clamped() {
        let mut verdict = RiskVerdict::new(&signal(), AccountId::from("a"));
        verdict.set_risk_score(dec!(150));
        assert_eq!(verdict.risk_score, dec!(100));

        verdict.set_risk_score(dec!(-5));
        assert_eq!(verdict.risk_score, dec!(0));
    }

    #[test]
    fn test_absorb_preserves_order() {
        let mut verdict = RiskVerdict::new(&signal(), AccountId::from("a"));
        verdict.absorb(
            vec!["w1".to_string(), "w2".to_string()],
            vec!["e1".to_string()],
        );
        assert_eq!(verdict.warnings, vec!["w1", "w2"]);
        assert_eq!(verdict.errors, vec!["e1"]);
        assert!(!verdict.valid);
    }
}
