//! Prometheus metrics and structured logging for the risk-gating engine.
//!
//! - counters for validation outcomes and per-stage blocks
//! - gauges for breaker state and resource usage
//! - histograms for risk scores and validation latency
//! - JSON logging in production, pretty logging in development

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
