//! Circuit breaker guarding the validation pipeline.
//!
//! Two states: ARMED (pipeline runs normally) and TRIPPED (pipeline fails
//! fast). Trips on drawdown breach or manual operator action; auto-resets
//! once the cooldown deadline passes. The reset happens lazily (next
//! validation call) or eagerly (monitor tick), whichever fires first;
//! both paths race safely through compare_exchange.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakerState {
    Armed,
    Tripped,
}

/// Outcome of polling the breaker at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerPoll {
    /// Breaker is armed; pipeline may run.
    Armed,
    /// The cooldown elapsed and this poll performed the reset.
    JustReset,
    /// Breaker is tripped; fail fast.
    Tripped,
}

/// Point-in-time breaker status for summaries and health checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerStatus {
    pub state: BreakerState,
    /// Trips since the last reset.
    pub failure_count: u32,
    /// Trips over the process lifetime.
    pub total_trips: u64,
    pub tripped_at_ms: Option<i64>,
    pub cooldown_deadline_ms: Option<i64>,
    pub reason: Option<String>,
}

/// ARMED/TRIPPED circuit breaker with timed auto-reset.
///
/// Thread-safe; shared via `Arc` between the request path and monitors.
pub struct CircuitBreaker {
    tripped: AtomicBool,
    tripped_at_ms: AtomicI64,
    deadline_ms: AtomicI64,
    cooldown_ms: AtomicI64,
    /// Trips since the last reset. Zeroed on reset.
    failure_count: AtomicU32,
    /// Trips over the process lifetime. Never reset.
    total_trips: AtomicI64,
    reason: RwLock<Option<String>>,
}

impl CircuitBreaker {
    /// Create an armed breaker with the given cooldown.
    #[must_use]
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            tripped: AtomicBool::new(false),
            tripped_at_ms: AtomicI64::new(0),
            deadline_ms: AtomicI64::new(0),
            cooldown_ms: AtomicI64::new(cooldown_ms.max(0)),
            failure_count: AtomicU32::new(0),
            total_trips: AtomicI64::new(0),
            reason: RwLock::new(None),
        }
    }

    /// Update the cooldown applied to future trips.
    pub fn set_cooldown_ms(&self, cooldown_ms: i64) {
        self.cooldown_ms.store(cooldown_ms.max(0), Ordering::SeqCst);
    }

    /// Trip the breaker. Returns true if this call performed the
    /// ARMED -> TRIPPED transition; false if it was already tripped.
    pub fn trip(&self, reason: &str, now_ms: i64) -> bool {
        if self
            .tripped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let cooldown = self.cooldown_ms.load(Ordering::SeqCst);
            self.tripped_at_ms.store(now_ms, Ordering::SeqCst);
            self.deadline_ms.store(now_ms + cooldown, Ordering::SeqCst);
            self.failure_count.fetch_add(1, Ordering::SeqCst);
            self.total_trips.fetch_add(1, Ordering::SeqCst);
            {
                let mut guard = self.reason.write();
                *guard = Some(reason.to_string());
            }
            error!(reason, cooldown_ms = cooldown, "CIRCUIT BREAKER TRIPPED");
            true
        } else {
            warn!(new_reason = reason, "breaker already tripped, ignoring trip");
            false
        }
    }

    /// Poll the breaker: performs the lazy TRIPPED -> ARMED transition
    /// when the cooldown deadline has passed.
    ///
    /// Idempotent and safe to race: exactly one concurrent poll observes
    /// `JustReset`, the others see `Armed`.
    pub fn poll(&self, now_ms: i64) -> BreakerPoll {
        if !self.tripped.load(Ordering::SeqCst) {
            return BreakerPoll::Armed;
        }
        if now_ms < self.deadline_ms.load(Ordering::SeqCst) {
            return BreakerPoll::Tripped;
        }
        // Deadline elapsed; exactly one caller wins the reset.
        if self
            .tripped
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.failure_count.store(0, Ordering::SeqCst);
            let previous = self.reason.write().take();
            info!(previous_reason = ?previous, "circuit breaker auto-reset");
            BreakerPoll::JustReset
        } else {
            BreakerPoll::Armed
        }
    }

    /// Force an immediate reset regardless of the deadline.
    ///
    /// Operator action. Returns true if the breaker was tripped.
    pub fn force_reset(&self) -> bool {
        if self
            .tripped
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.failure_count.store(0, Ordering::SeqCst);
            let previous = self.reason.write().take();
            info!(previous_reason = ?previous, "circuit breaker manually reset");
            true
        } else {
            false
        }
    }

    /// Current state without performing the lazy reset.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        if self.tripped.load(Ordering::SeqCst) {
            BreakerState::Tripped
        } else {
            BreakerState::Armed
        }
    }

    /// Remaining cooldown in milliseconds, zero when armed.
    #[must_use]
    pub fn remaining_cooldown_ms(&self, now_ms: i64) -> i64 {
        if self.state() == BreakerState::Armed {
            return 0;
        }
        (self.deadline_ms.load(Ordering::SeqCst) - now_ms).max(0)
    }

    /// Snapshot for summaries and health checks.
    #[must_use]
    pub fn status(&self) -> BreakerStatus {
        let tripped = self.tripped.load(Ordering::SeqCst);
        BreakerStatus {
            state: if tripped {
                BreakerState::Tripped
            } else {
                BreakerState::Armed
            },
            failure_count: self.failure_count.load(Ordering::SeqCst),
            total_trips: self.total_trips.load(Ordering::SeqCst) as u64,
            tripped_at_ms: tripped.then(|| self.tripped_at_ms.load(Ordering::SeqCst)),
            cooldown_deadline_ms: tripped.then(|| self.deadline_ms.load(Ordering::SeqCst)),
            reason: if tripped { self.reason.read().clone() } else { None },
        }
    }
}
