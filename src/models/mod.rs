//! Data models for journal trades and analytics reports.

mod report;
mod trade;

pub use report::{DailyCalendar, EquityPoint, SummaryReport};
pub use trade::{NewTrade, TradeRecord, TradeSide, TradeUpdate};

#[cfg(test)]
pub(crate) use trade::fixtures;
