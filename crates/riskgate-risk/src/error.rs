//! Risk error taxonomy.
//!
//! Expected risk violations never surface as `Err` from the pipeline;
//! they are recorded inside the verdict. These types classify the
//! findings and carry the stage attribution the per-stage error
//! counters are keyed on.

use thiserror::Error;

use crate::stages::Stage;

#[derive(Debug, Error)]
pub enum RiskError {
    /// Malformed signal; always fatal to the call.
    #[error("Structural validation failed: {0}")]
    Structural(String),

    /// A configured limit or stage precondition was breached.
    #[error("{message}")]
    LimitBreached { stage: Stage, message: String },

    /// A collaborator failed or timed out. Trading is blocked rather
    /// than permitted on missing data.
    #[error("{dependency} unavailable, failing closed: {source}")]
    CollaboratorUnavailable {
        stage: Stage,
        dependency: &'static str,
        #[source]
        source: riskgate_collab::CollabError,
    },

    /// The circuit breaker is open; fast-fail path.
    #[error("Circuit breaker open; {0}")]
    CircuitOpen(String),
}

impl RiskError {
    /// Metric label for the error, taken from the stage tag rather than
    /// the message text.
    pub fn stage_label(&self) -> &'static str {
        match self {
            Self::Structural(_) => "structural",
            Self::LimitBreached { stage, .. } => stage.label(),
            Self::CollaboratorUnavailable { stage, .. } => stage.label(),
            Self::CircuitOpen(_) => "breaker",
        }
    }
}
