//! Analytics outputs: summary statistics, daily calendar and equity curve.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Performance summary over a set of journal trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    // === Counts ===
    /// All trades in the input, open or closed
    pub total_trades: usize,

    /// Trades flagged closed, whether or not their P&L is computable
    pub closed_trades: usize,

    /// Computable trades with P&L >= 0
    pub winning_trades: usize,

    /// Computable trades with P&L < 0
    pub losing_trades: usize,

    // === Win/Loss Metrics ===
    /// Win rate as a percentage (0 to 100)
    pub win_rate: f64,

    /// Sum of all realized P&L
    pub net_pnl: Decimal,

    /// Average P&L of winning trades
    pub avg_win: Decimal,

    /// Average P&L of losing trades (negative when any exist)
    pub avg_loss: Decimal,

    /// Gross profit / gross loss; infinite when there are wins but no losses
    #[serde(with = "ratio")]
    pub profit_factor: f64,

    /// Expected P&L per trade
    pub expectancy: Decimal,

    // === Breakdowns ===
    pub by_symbol: BTreeMap<String, Decimal>,

    pub by_strategy: BTreeMap<String, Decimal>,

    /// Keyed by "YYYY-MM"
    pub monthly: BTreeMap<String, Decimal>,
}

impl SummaryReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self {
            total_trades: 0,
            closed_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            net_pnl: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: 0.0,
            expectancy: Decimal::ZERO,
            by_symbol: BTreeMap::new(),
            by_strategy: BTreeMap::new(),
            monthly: BTreeMap::new(),
        }
    }

    /// Number of trades whose P&L entered the statistics.
    pub fn computable_trades(&self) -> usize {
        self.winning_trades + self.losing_trades
    }
}

impl Default for SummaryReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Realized P&L per calendar day over a resolved date window.
///
/// Sparse: days without closed trades are absent from `daily`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCalendar {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily: BTreeMap<NaiveDate, Decimal>,
}

/// One point on the cumulative equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: Decimal,
}

/// Serde adapter for ratios that may be infinite. JSON has no infinity
/// literal, so infinities are written as the strings "Infinity"/"-Infinity".
mod ratio {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            let text = if value.is_sign_positive() { "Infinity" } else { "-Infinity" };
            serializer.serialize_str(text)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "Infinity" | "inf" => Ok(f64::INFINITY),
                "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid ratio '{}'", other))),
            },
        }
    }
}
