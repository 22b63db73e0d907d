//! Error types for the tally core.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TallyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a run is already in progress")]
    RunInProgress,

    #[error("no run is active")]
    SessionInactive,
}
