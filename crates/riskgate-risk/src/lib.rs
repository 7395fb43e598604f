//! Risk-gating engine core.
//!
//! Stands between a generated trading signal and order execution:
//! - `SignalValidationPipeline`: fixed-order multi-stage validation with
//!   warning/error aggregation and a composite risk score
//! - `CircuitBreaker`: ARMED/TRIPPED state machine with timed auto-reset
//! - `RiskContext`: shared mutable state (daily, resource and threat
//!   metrics, alert log) read by the pipeline and written by monitors
//! - Stage assessors: portfolio, sizing, correlation, market, daily
//!   limits, drawdown, threat, resources

pub mod breaker;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod stages;

pub use breaker::{BreakerPoll, BreakerState, BreakerStatus, CircuitBreaker};
pub use config::{RiskConfig, RiskConfigPatch};
pub use context::{DailyMetrics, ResourceMetrics, RiskContext, ThreatMetrics};
pub use error::RiskError;
pub use pipeline::{SignalValidationPipeline, ValidationOutcome};
pub use stages::Stage;
