//! Resource probes feeding the resource sampler.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// One sample of process-level resource usage.
#[derive(Debug, Clone, Default)]
pub struct ProbeSample {
    /// Fraction of the memory budget in use, in [0, 1].
    pub memory_ratio: Decimal,
    /// Fraction of the CPU budget in use, in [0, 1].
    pub cpu_ratio: Decimal,
    pub active_connections: u64,
    pub requests_per_minute: u64,
}

/// Source of resource samples. Implementations must be cheap; the
/// sampler calls this on every tick.
pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> ProbeSample;
}

/// Fixed sample, for wiring and tests.
#[derive(Debug, Default)]
pub struct StaticProbe {
    sample: Mutex<ProbeSample>,
}

impl StaticProbe {
    pub fn new(sample: ProbeSample) -> Self {
        Self {
            sample: Mutex::new(sample),
        }
    }

    pub fn set(&self, sample: ProbeSample) {
        *self.sample.lock() = sample;
    }
}

impl ResourceProbe for StaticProbe {
    fn sample(&self) -> ProbeSample {
        self.sample.lock().clone()
    }
}

/// Counter-backed probe fed by the hosting application.
///
/// Connection and request counters are maintained by the outer service
/// through `connection_opened`/`connection_closed` and `record_request`;
/// memory and CPU gauges are set by whatever observer the host runs.
/// Request rate is measured over a sliding one-minute window of
/// timestamps.
#[derive(Default)]
pub struct CounterProbe {
    connections: AtomicI64,
    memory_ratio_bps: AtomicU64,
    cpu_ratio_bps: AtomicU64,
    requests: Mutex<Vec<DateTime<Utc>>>,
}

impl CounterProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_request(&self, now: DateTime<Utc>) {
        self.requests.lock().push(now);
    }

    /// Set the memory gauge, in basis points of the budget.
    pub fn set_memory_ratio_bps(&self, bps: u64) {
        self.memory_ratio_bps.store(bps, Ordering::Relaxed);
    }

    /// Set the CPU gauge, in basis points of the budget.
    pub fn set_cpu_ratio_bps(&self, bps: u64) {
        self.cpu_ratio_bps.store(bps, Ordering::Relaxed);
    }

    fn requests_last_minute(&self, now: DateTime<Utc>) -> u64 {
        let cutoff = now - Duration::seconds(60);
        let mut requests = self.requests.lock();
        requests.retain(|t| *t >= cutoff);
        requests.len() as u64
    }
}

impl ResourceProbe for CounterProbe {
    fn sample(&self) -> ProbeSample {
        let now = Utc::now();
        ProbeSample {
            memory_ratio: Decimal::new(self.memory_ratio_bps.load(Ordering::Relaxed) as i64, 4),
            cpu_ratio: Decimal::new(self.cpu_ratio_bps.load(Ordering::Relaxed) as i64, 4),
            active_connections: self.connections.load(Ordering::Relaxed).max(0) as u64,
            requests_per_minute: self.requests_last_minute(now),
        }
    }
}
