//! Request-level errors surfaced to the CLI.

use thiserror::Error;

use crate::metrics::AnalyticsError;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Trade not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl JournalError {
    pub fn invalid(message: impl Into<String>) -> Self {
        JournalError::InvalidArgument(message.into())
    }
}
