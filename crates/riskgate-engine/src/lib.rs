//! Engine facade for the risk gate.
//!
//! Wires the validation pipeline, shared context and background
//! monitors behind one `RiskEngine` handle, and loads configuration
//! from TOML.

pub mod config;
pub mod engine;
pub mod error;

pub use config::{EngineConfig, MonitorIntervals};
pub use engine::{Health, HealthStatus, RiskEngine, RiskSummary};
pub use error::{EngineError, EngineResult};
