//! Engine error types.

use riskgate_collab::CollabError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollabError),
}

pub type EngineResult<T> = Result<T, EngineError>;
