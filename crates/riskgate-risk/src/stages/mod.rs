//! Validation pipeline stages.
//!
//! Each stage inspects one risk dimension and reports warnings and
//! errors. Stages never abort the pipeline themselves; the orchestration
//! in `pipeline` decides what short-circuits.

pub mod correlation;
pub mod drawdown;
pub mod limits;
pub mod market;
pub mod portfolio;
pub mod resource;
pub mod sizing;
pub mod threat;

pub use correlation::CorrelationRiskAssessor;
pub use drawdown::{DrawdownOutcome, DrawdownProtector};
pub use limits::DailyLimitsTracker;
pub use market::{MarketConditions, MarketRiskAssessor};
pub use portfolio::PortfolioRiskAssessor;
pub use resource::ResourceGovernor;
pub use sizing::PositionSizer;
pub use threat::{ThreatFindings, ThreatGate};

use crate::error::RiskError;

/// Pipeline stage identity, carried by every blocking error so metric
/// attribution never depends on message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Portfolio,
    Sizing,
    Correlation,
    Market,
    Limits,
    Drawdown,
    Threat,
    Resource,
}

impl Stage {
    /// Stable metric label for the stage.
    pub fn label(self) -> &'static str {
        match self {
            Self::Portfolio => "portfolio",
            Self::Sizing => "sizing",
            Self::Correlation => "correlation",
            Self::Market => "market",
            Self::Limits => "limits",
            Self::Drawdown => "drawdown",
            Self::Threat => "threat",
            Self::Resource => "resource",
        }
    }
}

/// Findings from one stage.
#[derive(Debug)]
pub struct StageReport {
    stage: Stage,
    /// Advisory findings; never invalidate the verdict.
    pub warnings: Vec<String>,
    /// Blocking findings, each tagged with the stage that raised it.
    pub errors: Vec<RiskError>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a breached limit or failed stage precondition.
    pub fn limit(&mut self, message: impl Into<String>) {
        self.errors.push(RiskError::LimitBreached {
            stage: self.stage,
            message: message.into(),
        });
    }

    /// Record a collaborator failure: fail closed.
    pub fn fail_closed(&mut self, dependency: &'static str, err: riskgate_collab::CollabError) {
        self.errors.push(RiskError::CollaboratorUnavailable {
            stage: self.stage,
            dependency,
            source: err,
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }
}
