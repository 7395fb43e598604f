//! Engine configuration and TOML file loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use riskgate_monitor::SchedulerConfig;
use riskgate_risk::RiskConfig;

use crate::error::EngineResult;

/// Monitor tick intervals in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorIntervals {
    #[serde(default = "default_risk_check_ms")]
    pub risk_check_ms: u64,
    #[serde(default = "default_resource_sample_ms")]
    pub resource_sample_ms: u64,
    #[serde(default = "default_threat_sweep_ms")]
    pub threat_sweep_ms: u64,
    #[serde(default = "default_breaker_check_ms")]
    pub breaker_check_ms: u64,
}

fn default_risk_check_ms() -> u64 {
    5_000
}

fn default_resource_sample_ms() -> u64 {
    1_000
}

fn default_threat_sweep_ms() -> u64 {
    60_000
}

fn default_breaker_check_ms() -> u64 {
    1_000
}

impl Default for MonitorIntervals {
    fn default() -> Self {
        Self {
            risk_check_ms: default_risk_check_ms(),
            resource_sample_ms: default_resource_sample_ms(),
            threat_sweep_ms: default_threat_sweep_ms(),
            breaker_check_ms: default_breaker_check_ms(),
        }
    }
}

impl From<MonitorIntervals> for SchedulerConfig {
    fn from(intervals: MonitorIntervals) -> Self {
        Self {
            risk_check_ms: intervals.risk_check_ms,
            resource_sample_ms: intervals.resource_sample_ms,
            threat_sweep_ms: intervals.threat_sweep_ms,
            breaker_check_ms: intervals.breaker_check_ms,
        }
    }
}

/// Top-level configuration: risk thresholds plus monitor intervals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub monitors: MonitorIntervals,
}

impl EngineConfig {
    /// Load from the path in `RISKGATE_CONFIG`, falling back to
    /// `config/default.toml`, falling back to built-in defaults when no
    /// file exists.
    pub fn load() -> EngineResult<Self> {
        let path =
            std::env::var("RISKGATE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
        if Path::new(&path).exists() {
            Self::from_file(&path)
        } else {
            info!("no config file at {}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Load and parse a TOML config file.
    pub fn from_file(path: &str) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        info!(path, "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.risk.max_daily_trades, 20);
        assert_eq!(config.monitors.threat_sweep_ms, 60_000);
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [risk]
            max_daily_trades = 50
            max_drawdown = "0.12"

            [monitors]
            breaker_check_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.risk.max_daily_trades, 50);
        assert_eq!(config.risk.max_drawdown, dec!(0.12));
        // Untouched fields keep their defaults.
        assert_eq!(config.risk.max_daily_loss, dec!(0.05));
        assert_eq!(config.monitors.breaker_check_ms, 250);
        assert_eq!(config.monitors.risk_check_ms, 5_000);
    }

    #[test]
    fn test_from_file_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[risk]\nmax_daily_trades = 7").unwrap();

        let config = EngineConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.risk.max_daily_trades, 7);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[risk\nmax_daily_trades = ").unwrap();

        let err = EngineConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, crate::EngineError::Parse(_)));
    }
}
