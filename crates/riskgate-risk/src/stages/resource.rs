//! System resource gate. Works off the most recent sample taken by the
//! resource monitor; a signal is never blocked on resource grounds when
//! no sample has been taken yet.

use tracing::warn;

use crate::config::RiskConfig;
use crate::context::ResourceMetrics;
use crate::stages::{Stage, StageReport};

pub struct ResourceGovernor;

impl ResourceGovernor {
    pub fn check(config: &RiskConfig, resources: &ResourceMetrics) -> StageReport {
        let mut report = StageReport::new(Stage::Resource);

        if resources.sampled_at.is_none() {
            return report;
        }

        if resources.memory_ratio > config.max_memory_ratio {
            report.limit(format!(
                "Memory usage {} above limit {}",
                resources.memory_ratio, config.max_memory_ratio
            ));
        }
        if resources.cpu_ratio > config.max_cpu_ratio {
            report.limit(format!(
                "CPU usage {} above limit {}",
                resources.cpu_ratio, config.max_cpu_ratio
            ));
        }
        if resources.active_connections > config.max_connections {
            report.limit(format!(
                "Active connections {} above limit {}",
                resources.active_connections, config.max_connections
            ));
        }
        if resources.requests_per_minute > config.max_requests_per_minute {
            report.limit(format!(
                "Request rate {}/min above limit {}",
                resources.requests_per_minute, config.max_requests_per_minute
            ));
        }

        if report.has_errors() {
            warn!(
                memory = %resources.memory_ratio,
                cpu = %resources.cpu_ratio,
                "resource limits breached"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_no_sample_passes_through() {
        let resources = ResourceMetrics {
            memory_ratio: dec!(0.99),
            cpu_ratio: dec!(0.99),
            active_connections: 10_000,
            requests_per_minute: 100_000,
            sampled_at: None,
        };
        let report = ResourceGovernor::check(&RiskConfig::default(), &resources);
        assert!(report.is_clean());
    }

    #[test]
    fn test_healthy_sample_is_clean() {
        let resources = ResourceMetrics {
            memory_ratio: dec!(0.40),
            cpu_ratio: dec!(0.35),
            active_connections: 12,
            requests_per_minute: 200,
            sampled_at: Some(Utc::now()),
        };
        let report = ResourceGovernor::check(&RiskConfig::default(), &resources);
        assert!(report.is_clean());
    }

    #[test]
    fn test_each_breach_is_a_separate_error() {
        let resources = ResourceMetrics {
            memory_ratio: dec!(0.90),
            cpu_ratio: dec!(0.95),
            active_connections: 2_000,
            requests_per_minute: 10_000,
            sampled_at: Some(Utc::now()),
        };
        let report = ResourceGovernor::check(&RiskConfig::default(), &resources);
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn test_exact_limit_passes() {
        let config = RiskConfig::default();
        let resources = ResourceMetrics {
            memory_ratio: config.max_memory_ratio,
            cpu_ratio: config.max_cpu_ratio,
            active_connections: config.max_connections,
            requests_per_minute: config.max_requests_per_minute,
            sampled_at: Some(Utc::now()),
        };
        let report = ResourceGovernor::check(&config, &resources);
        assert!(report.is_clean());
    }
}
