//! Collaborator error types.
//!
//! Any failure here is treated fail-closed by the engine: a stage that
//! cannot reach its collaborator blocks the trade instead of passing it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Collaborator timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type CollabResult<T> = Result<T, CollabError>;
