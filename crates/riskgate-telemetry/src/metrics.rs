//! Prometheus metrics for the risk-gating engine.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means a duplicate metric name, which is a fatal configuration
//! error that should crash at startup rather than fail silently. These
//! panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_histogram_vec,
    register_int_gauge, CounterVec, Gauge, Histogram, HistogramVec, IntGauge,
};

/// Total validations by outcome. Labels: outcome (valid/invalid).
pub static VALIDATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskgate_validations_total",
        "Total signal validations by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Blocking errors by stage.
pub static STAGE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskgate_stage_errors_total",
        "Total blocking errors recorded, by pipeline stage",
        &["stage"]
    )
    .unwrap()
});

/// Breaker state (1 = tripped, 0 = armed).
pub static BREAKER_TRIPPED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "riskgate_breaker_tripped",
        "Circuit breaker state (1=tripped)"
    )
    .unwrap()
});

/// Total breaker trips.
pub static BREAKER_TRIPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskgate_breaker_trips_total",
        "Total circuit breaker trips",
        &["reason"]
    )
    .unwrap()
});

/// Composite risk score distribution.
pub static RISK_SCORE: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "riskgate_risk_score",
        "Composite risk score distribution",
        vec![5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
    )
    .unwrap()
});

/// Validation latency in milliseconds.
pub static VALIDATION_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "riskgate_validation_latency_ms",
        "End-to-end validation latency in milliseconds",
        &["outcome"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0]
    )
    .unwrap()
});

/// Attempted trades in the current daily window.
pub static DAILY_TRADES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "riskgate_daily_trades",
        "Attempted trades in the current daily window"
    )
    .unwrap()
});

/// Memory usage fraction from the last resource sample.
pub static MEMORY_RATIO: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "riskgate_memory_ratio",
        "Memory budget fraction in use, last sample"
    )
    .unwrap()
});

/// CPU usage fraction from the last resource sample.
pub static CPU_RATIO: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "riskgate_cpu_ratio",
        "CPU budget fraction in use, last sample"
    )
    .unwrap()
});

/// Facade for recording metrics from the engine.
pub struct Metrics;

impl Metrics {
    /// Record a completed validation.
    pub fn validation(valid: bool, risk_score: f64, latency_ms: f64) {
        let outcome = if valid { "valid" } else { "invalid" };
        VALIDATIONS_TOTAL.with_label_values(&[outcome]).inc();
        RISK_SCORE.observe(risk_score);
        VALIDATION_LATENCY_MS
            .with_label_values(&[outcome])
            .observe(latency_ms);
    }

    /// Record a blocking error from a named stage.
    pub fn stage_error(stage: &str) {
        STAGE_ERRORS_TOTAL.with_label_values(&[stage]).inc();
    }

    /// Record a breaker trip.
    pub fn breaker_tripped(reason: &str) {
        BREAKER_TRIPPED.set(1.0);
        BREAKER_TRIPS_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record the breaker re-arming.
    pub fn breaker_armed() {
        BREAKER_TRIPPED.set(0.0);
    }

    /// Publish the daily attempted-trade counter.
    pub fn daily_trades(count: u64) {
        DAILY_TRADES.set(count as i64);
    }

    /// Publish the latest resource sample.
    pub fn resource_sample(memory_ratio: f64, cpu_ratio: f64) {
        MEMORY_RATIO.set(memory_ratio);
        CPU_RATIO.set(cpu_ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_counters() {
        Metrics::validation(true, 12.0, 1.5);
        Metrics::validation(false, 80.0, 2.0);

        assert!(VALIDATIONS_TOTAL.with_label_values(&["valid"]).get() >= 1.0);
        assert!(VALIDATIONS_TOTAL.with_label_values(&["invalid"]).get() >= 1.0);
    }

    #[test]
    fn test_breaker_gauge_tracks_state() {
        Metrics::breaker_tripped("drawdown");
        assert_eq!(BREAKER_TRIPPED.get(), 1.0);
        Metrics::breaker_armed();
        assert_eq!(BREAKER_TRIPPED.get(), 0.0);
    }
}
