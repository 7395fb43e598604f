//! Risk engine configuration.
//!
//! All thresholds live here and are hot-reloadable through
//! `RiskConfigPatch`: a partial update merges only the fields it carries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Risk thresholds for the validation pipeline and monitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum total exposure as a fraction of portfolio value.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    /// Maximum risk budget per trade as a fraction of portfolio value.
    #[serde(default = "default_max_risk_per_trade")]
    pub max_risk_per_trade: Decimal,
    /// Maximum number of concurrently open trades per account.
    #[serde(default = "default_max_concurrent_trades")]
    pub max_concurrent_trades: usize,
    /// Maximum trades per account per calendar day.
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u64,
    /// Maximum realized daily loss as a fraction of portfolio value.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Maximum drawdown from peak before trades are blocked.
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,
    /// Drawdown beyond which the circuit breaker trips.
    /// Must be greater than `max_drawdown`.
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: Decimal,
    /// Circuit breaker cooldown in milliseconds.
    #[serde(default = "default_breaker_cooldown_ms")]
    pub breaker_cooldown_ms: i64,
    /// Correlation coefficient above which a warning is raised.
    #[serde(default = "default_correlation_limit")]
    pub correlation_limit: Decimal,
    /// Volatility above which the market stage warns.
    #[serde(default = "default_volatility_limit")]
    pub volatility_limit: Decimal,
    /// Liquidity below which the market stage warns (quote currency).
    #[serde(default = "default_liquidity_threshold")]
    pub liquidity_threshold: Decimal,
    /// Maximum allowed leverage.
    #[serde(default = "default_max_leverage")]
    pub max_leverage: Decimal,
    /// Minimum order notional in quote currency. Smaller orders error.
    #[serde(default = "default_min_order_value")]
    pub min_order_value: Decimal,
    /// Concentration ratio above which a warning is raised.
    #[serde(default = "default_concentration_warning")]
    pub concentration_warning: Decimal,
    /// Maximum process memory usage ratio.
    #[serde(default = "default_max_memory_ratio")]
    pub max_memory_ratio: Decimal,
    /// Maximum process CPU usage ratio.
    #[serde(default = "default_max_cpu_ratio")]
    pub max_cpu_ratio: Decimal,
    /// Maximum active connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u64,
    /// Maximum validation requests per minute.
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u64,
    /// Failed attempts at or above which the threat gate blocks.
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// Suspicious-record count above which the sweep task alerts.
    #[serde(default = "default_suspicious_alert_threshold")]
    pub suspicious_alert_threshold: usize,
    /// Lookback window for threat records, in seconds.
    #[serde(default = "default_threat_lookback_secs")]
    pub threat_lookback_secs: i64,
}

fn default_max_position_size() -> Decimal {
    Decimal::new(25, 2) // 0.25
}

fn default_max_risk_per_trade() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_max_concurrent_trades() -> usize {
    5
}

fn default_max_daily_trades() -> u64 {
    20
}

fn default_max_daily_loss() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_max_drawdown() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

fn default_circuit_breaker_threshold() -> Decimal {
    Decimal::new(15, 2) // 0.15
}

fn default_breaker_cooldown_ms() -> i64 {
    300_000 // 5 minutes
}

fn default_correlation_limit() -> Decimal {
    Decimal::new(7, 1) // 0.7
}

fn default_volatility_limit() -> Decimal {
    Decimal::new(15, 2) // 0.15
}

fn default_liquidity_threshold() -> Decimal {
    Decimal::from(100_000)
}

fn default_max_leverage() -> Decimal {
    Decimal::from(10)
}

fn default_min_order_value() -> Decimal {
    Decimal::from(10)
}

fn default_concentration_warning() -> Decimal {
    Decimal::new(8, 1) // 0.8
}

fn default_max_memory_ratio() -> Decimal {
    Decimal::new(85, 2) // 0.85
}

fn default_max_cpu_ratio() -> Decimal {
    Decimal::new(90, 2) // 0.90
}

fn default_max_connections() -> u64 {
    1_000
}

fn default_max_requests_per_minute() -> u64 {
    6_000
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_suspicious_alert_threshold() -> usize {
    10
}

fn default_threat_lookback_secs() -> i64 {
    3_600
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: default_max_position_size(),
            max_risk_per_trade: default_max_risk_per_trade(),
            max_concurrent_trades: default_max_concurrent_trades(),
            max_daily_trades: default_max_daily_trades(),
            max_daily_loss: default_max_daily_loss(),
            max_drawdown: default_max_drawdown(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            breaker_cooldown_ms: default_breaker_cooldown_ms(),
            correlation_limit: default_correlation_limit(),
            volatility_limit: default_volatility_limit(),
            liquidity_threshold: default_liquidity_threshold(),
            max_leverage: default_max_leverage(),
            min_order_value: default_min_order_value(),
            concentration_warning: default_concentration_warning(),
            max_memory_ratio: default_max_memory_ratio(),
            max_cpu_ratio: default_max_cpu_ratio(),
            max_connections: default_max_connections(),
            max_requests_per_minute: default_max_requests_per_minute(),
            max_failed_attempts: default_max_failed_attempts(),
            suspicious_alert_threshold: default_suspicious_alert_threshold(),
            threat_lookback_secs: default_threat_lookback_secs(),
        }
    }
}

/// Partial config update. Only the fields that are `Some` are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskConfigPatch {
    pub max_position_size: Option<Decimal>,
    pub max_risk_per_trade: Option<Decimal>,
    pub max_concurrent_trades: Option<usize>,
    pub max_daily_trades: Option<u64>,
    pub max_daily_loss: Option<Decimal>,
    pub max_drawdown: Option<Decimal>,
    pub circuit_breaker_threshold: Option<Decimal>,
    pub breaker_cooldown_ms: Option<i64>,
    pub correlation_limit: Option<Decimal>,
    pub volatility_limit: Option<Decimal>,
    pub liquidity_threshold: Option<Decimal>,
    pub max_leverage: Option<Decimal>,
    pub min_order_value: Option<Decimal>,
    pub concentration_warning: Option<Decimal>,
    pub max_memory_ratio: Option<Decimal>,
    pub max_cpu_ratio: Option<Decimal>,
    pub max_connections: Option<u64>,
    pub max_requests_per_minute: Option<u64>,
    pub max_failed_attempts: Option<u32>,
    pub suspicious_alert_threshold: Option<usize>,
    pub threat_lookback_secs: Option<i64>,
}

impl RiskConfigPatch {
    /// Merge this patch into a config, overwriting only provided fields.
    pub fn apply(&self, config: &mut RiskConfig) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field.clone() {
                    config.$field = value;
                })*
            };
        }
        merge!(
            max_position_size,
            max_risk_per_trade,
            max_concurrent_trades,
            max_daily_trades,
            max_daily_loss,
            max_drawdown,
            circuit_breaker_threshold,
            breaker_cooldown_ms,
            correlation_limit,
            volatility_limit,
            liquidity_threshold,
            max_leverage,
            min_order_value,
            concentration_warning,
            max_memory_ratio,
            max_cpu_ratio,
            max_connections,
            max_requests_per_minute,
            max_failed_attempts,
            suspicious_alert_threshold,
            threat_lookback_secs,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = RiskConfig::default();
        assert_eq!(config.max_risk_per_trade, dec!(0.02));
        assert_eq!(config.max_drawdown, dec!(0.10));
        assert!(config.circuit_breaker_threshold > config.max_drawdown);
    }

    #[test]
    fn test_patch_merges_only_provided_fields() {
        let mut config = RiskConfig::default();
        let patch = RiskConfigPatch {
            max_drawdown: Some(dec!(0.08)),
            max_daily_trades: Some(10),
            ..Default::default()
        };
        patch.apply(&mut config);

        assert_eq!(config.max_drawdown, dec!(0.08));
        assert_eq!(config.max_daily_trades, 10);
        // Untouched field keeps its default.
        assert_eq!(config.max_risk_per_trade, dec!(0.02));
    }

    #[test]
    fn test_toml_roundtrip_with_partial_file() {
        let toml = r#"
            max_drawdown = "0.12"
            max_daily_trades = 30
        "#;
        let config: RiskConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_drawdown, dec!(0.12));
        assert_eq!(config.max_daily_trades, 30);
        assert_eq!(config.max_failed_attempts, 5);
    }
}
