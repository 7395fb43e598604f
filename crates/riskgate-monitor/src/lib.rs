//! Background schedulers for the risk-gating engine.
//!
//! Four independent interval tasks keep `RiskContext` current between
//! validations:
//! - daily rollover and risk-usage checks
//! - resource sampling through a pluggable probe
//! - threat-record sweeps and failed-attempt decay
//! - eager circuit-breaker cooldown checks
//!
//! Each task owns its own timer; a slow sweep never delays a sample.

pub mod probe;
pub mod scheduler;

pub use probe::{CounterProbe, ProbeSample, ResourceProbe, StaticProbe};
pub use scheduler::{MonitorHandles, RiskMonitorScheduler, SchedulerConfig};
