//! Core domain types for the risk-gating engine.
//!
//! This crate provides the fundamental types shared across the workspace:
//! - `Price`, `Size`: precision-safe numeric types
//! - `Signal`, `AdjustedSignal`: a proposed trade and its gated copy
//! - `RiskVerdict`: the pipeline's answer for a single signal
//! - `RiskAlert`, `AlertLog`: bounded alert bookkeeping
//! - `Position`, `TradeRecord`, `AccountState`: storage-facing records

pub mod account;
pub mod alert;
pub mod decimal;
pub mod error;
pub mod signal;
pub mod verdict;

pub use account::{AccountId, AccountState, Position, ThreatRecord, TradeRecord};
pub use alert::{AlertLog, AlertSeverity, RiskAlert};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use signal::{base_of, AdjustedSignal, Side, Signal};
pub use verdict::RiskVerdict;
