//! Risk alerts and the bounded alert log.
//!
//! Alerts are immutable once created. The log is FIFO-trimmed at a fixed
//! capacity so a noisy incident cannot grow memory without bound.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// An alert emitted by the engine or its monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    /// Severity level.
    pub severity: AlertSeverity,
    /// Human-readable message.
    pub message: String,
    /// Structured payload for machine consumers.
    pub data: Value,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl RiskAlert {
    /// Create an alert stamped with the current time.
    pub fn new(severity: AlertSeverity, message: impl Into<String>, data: Value) -> Self {
        Self {
            severity,
            message: message.into(),
            data,
            created_at: Utc::now(),
        }
    }
}

/// Default alert log capacity.
pub const DEFAULT_ALERT_CAPACITY: usize = 500;

/// Bounded, FIFO-trimmed alert log.
///
/// Thread-safe; shared between the request path and the monitor tasks.
pub struct AlertLog {
    entries: Mutex<VecDeque<RiskAlert>>,
    capacity: usize,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ALERT_CAPACITY)
    }
}

impl AlertLog {
    /// Create a log that keeps at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Append an alert, evicting the oldest entry when full.
    pub fn push(&self, alert: RiskAlert) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(alert);
    }

    /// The `n` most recent alerts, newest last.
    pub fn recent(&self, n: usize) -> Vec<RiskAlert> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of alerts currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_and_recent() {
        let log = AlertLog::with_capacity(10);
        log.push(RiskAlert::new(AlertSeverity::Info, "first", json!({})));
        log.push(RiskAlert::new(AlertSeverity::Warning, "second", json!({})));

        let recent = log.recent(5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "first");
        assert_eq!(recent[1].message, "second");
    }

    #[test]
    fn test_fifo_trim_at_capacity() {
        let log = AlertLog::with_capacity(3);
        for i in 0..5 {
            log.push(RiskAlert::new(
                AlertSeverity::Info,
                format!("alert {}", i),
                json!({}),
            ));
        }

        assert_eq!(log.len(), 3);
        let recent = log.recent(10);
        assert_eq!(recent[0].message, "alert 2");
        assert_eq!(recent[2].message, "alert 4");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::High > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }
}
