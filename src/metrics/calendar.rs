//! Daily P&L calendar over a date window.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use super::calculator::{accumulate, MetricsCalculator};
use super::error::AnalyticsError;
use crate::models::{DailyCalendar, TradeRecord};

/// Lookback used when the caller gives no start bound.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 180;

/// Inclusive UTC time window for calendar queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarWindow {
    /// Resolve optional bounds against `now`.
    ///
    /// A missing end defaults to `now`; a missing start defaults to
    /// `end - lookback_days`.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
        lookback_days: i64,
    ) -> Result<Self, AnalyticsError> {
        let end = match end {
            Some(raw) => parse_timestamp(raw)?,
            None => now,
        };
        let start = match start {
            Some(raw) => parse_timestamp(raw)?,
            None => Duration::try_days(lookback_days)
                .and_then(|lookback| end.checked_sub_signed(lookback))
                .ok_or(AnalyticsError::LookbackOutOfRange(lookback_days))?,
        };

        if start > end {
            return Err(AnalyticsError::InvalidWindow { start, end });
        }

        Ok(Self { start, end })
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Parse a user-supplied date bound.
///
/// Accepts RFC 3339 (`2024-03-15T10:00:00Z`), a naive timestamp read as UTC
/// (`2024-03-15T10:00:00`), or a bare date at midnight UTC (`2024-03-15`).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AnalyticsError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(AnalyticsError::InvalidDate(raw.to_string()))
}

impl MetricsCalculator {
    /// Sum realized P&L per UTC calendar day of exit.
    ///
    /// Trades are expected to be closed and exited inside the window; anything
    /// else contributes nothing. Days without trades are absent from the map.
    pub fn daily_pnl(trades: &[TradeRecord], window: &CalendarWindow) -> DailyCalendar {
        let mut daily = BTreeMap::new();

        for trade in trades {
            let (Some(pnl), Some(exit_date)) = (Self::compute_pnl(trade), trade.exit_date) else {
                continue;
            };
            if !window.contains(exit_date) {
                continue;
            }
            accumulate(&mut daily, exit_date.date_naive(), pnl);
        }

        DailyCalendar {
            start: window.start.date_naive(),
            end: window.end.date_naive(),
            daily,
        }
    }
}
