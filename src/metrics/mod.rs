//! Analytics engine: realized P&L, summary statistics, daily calendar and
//! equity curve. Every computation is a pure function of its input trades.

mod calculator;
mod calendar;
mod equity;
mod error;
mod ratios;

pub use calculator::{MetricsCalculator, UNLABELED_STRATEGY};
pub use calendar::{parse_timestamp, CalendarWindow, DEFAULT_LOOKBACK_DAYS};
pub use error::AnalyticsError;
