use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Invalid date '{0}': expected RFC 3339 timestamp or YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Lookback of {0} days is outside the supported date range")]
    LookbackOutOfRange(i64),

    #[error("Invalid date window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
