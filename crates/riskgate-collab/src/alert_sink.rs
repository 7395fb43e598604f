//! Alert sink: fire-and-forget alert publication.
//!
//! `publish` must never block the pipeline. Sinks that forward to slow
//! channels (chat, e-mail, webhooks) must buffer or drop, not wait.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use riskgate_core::{AlertSeverity, RiskAlert};

/// Alert publication contract.
pub trait AlertSink: Send + Sync {
    /// Publish an alert. Must not block; dropping under backpressure is
    /// acceptable and preferable to stalling validation.
    fn publish(&self, alert: RiskAlert);
}

/// Sink that forwards alerts into a bounded tokio channel.
///
/// Uses `try_send`; alerts are dropped (with a log line) when the
/// consumer falls behind.
pub struct ChannelAlertSink {
    tx: mpsc::Sender<RiskAlert>,
}

impl ChannelAlertSink {
    /// Create a sink and its receiving end.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RiskAlert>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlertSink {
    fn publish(&self, alert: RiskAlert) {
        if let Err(e) = self.tx.try_send(alert) {
            warn!(error = %e, "alert channel full, dropping alert");
        }
    }
}

/// Sink that writes alerts to the tracing log. The default for local runs.
#[derive(Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn publish(&self, alert: RiskAlert) {
        match alert.severity {
            AlertSeverity::Info => info!(message = %alert.message, "risk alert"),
            AlertSeverity::Warning => warn!(message = %alert.message, "risk alert"),
            AlertSeverity::High | AlertSeverity::Critical => {
                tracing::error!(severity = %alert.severity, message = %alert.message, "risk alert")
            }
        }
    }
}

/// Recording sink for tests.
#[derive(Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<RiskAlert>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<RiskAlert> {
        self.alerts.lock().clone()
    }

    pub fn count_with_severity(&self, severity: AlertSeverity) -> usize {
        self.alerts
            .lock()
            .iter()
            .filter(|a| a.severity == severity)
            .count()
    }
}

impl AlertSink for RecordingAlertSink {
    fn publish(&self, alert: RiskAlert) {
        self.alerts.lock().push(alert);
    }
}
