//! Trade model representing individual journal entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::JournalError;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "long",
            TradeSide::Short => "short",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(TradeSide::Long),
            "short" => Ok(TradeSide::Short),
            other => anyhow::bail!("unknown trade side '{}' (expected long or short)", other),
        }
    }
}

/// A trade as read back from the journal.
///
/// Price, quantity and date fields are optional because a stored row can carry
/// values that fail to decode. Such a trade still counts towards totals but is
/// never PnL-computable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Store-assigned identifier
    pub id: String,

    /// Instrument symbol, uppercase
    pub symbol: String,

    /// Trade direction
    pub side: TradeSide,

    /// Strategy label
    pub strategy: Option<String>,

    /// When the position was opened (UTC)
    pub entry_date: Option<DateTime<Utc>>,

    /// When the position was closed (UTC)
    pub exit_date: Option<DateTime<Utc>>,

    pub entry_price: Option<Decimal>,

    pub exit_price: Option<Decimal>,

    /// Position size in units (shares/contracts)
    pub quantity: Option<Decimal>,

    /// Total fees and commissions (None when the stored value is unreadable)
    #[serde(default)]
    pub fees: Option<Decimal>,

    /// Setup description
    pub setup: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Planned risk in currency
    pub risk_amount: Option<Decimal>,

    pub stop_loss: Option<Decimal>,

    pub take_profit: Option<Decimal>,

    /// Whether the trade is closed
    #[serde(default)]
    pub closed: bool,

    pub created_at: Option<DateTime<Utc>>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl TradeRecord {
    /// Realized P&L net of fees, or `None` when the trade is open or lacks the
    /// prices, quantity or fees needed to evaluate it.
    pub fn realized_pnl(&self) -> Option<Decimal> {
        if !self.closed {
            return None;
        }

        let entry = self.entry_price?;
        let exit = self.exit_price?;
        let quantity = self.quantity?;
        let fees = self.fees?;

        let price_diff = match self.side {
            TradeSide::Long => exit.checked_sub(entry)?,
            TradeSide::Short => entry.checked_sub(exit)?,
        };

        price_diff.checked_mul(quantity)?.checked_sub(fees)
    }

    /// Label used when grouping by strategy.
    pub fn strategy_label(&self) -> Option<&str> {
        self.strategy.as_deref().filter(|s| !s.is_empty())
    }
}

/// Input for recording a new trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    pub symbol: String,
    pub side: TradeSide,
    pub strategy: Option<String>,
    pub entry_date: DateTime<Utc>,
    pub exit_date: Option<DateTime<Utc>>,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default)]
    pub fees: Decimal,
    pub setup: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub risk_amount: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    #[serde(default)]
    pub closed: bool,
}

impl NewTrade {
    /// Create an open trade with only the required fields set.
    pub fn new(
        symbol: impl Into<String>,
        side: TradeSide,
        entry_date: DateTime<Utc>,
        entry_price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            strategy: None,
            entry_date,
            exit_date: None,
            entry_price,
            exit_price: None,
            quantity,
            fees: Decimal::ZERO,
            setup: None,
            notes: None,
            tags: Vec::new(),
            risk_amount: None,
            stop_loss: None,
            take_profit: None,
            closed: false,
        }
    }

    /// Check field constraints before the trade is stored.
    pub fn validate(&self) -> Result<(), JournalError> {
        if self.symbol.trim().is_empty() {
            return Err(JournalError::invalid("symbol must not be empty"));
        }
        require_positive("entry_price", Some(self.entry_price))?;
        require_positive("exit_price", self.exit_price)?;
        require_positive("quantity", Some(self.quantity))?;
        require_non_negative("fees", Some(self.fees))?;
        require_non_negative("risk_amount", self.risk_amount)?;
        require_non_negative("stop_loss", self.stop_loss)?;
        require_non_negative("take_profit", self.take_profit)?;
        Ok(())
    }

    /// Uppercase the symbol and mark the trade closed once exit data is known.
    pub fn normalized(mut self) -> Self {
        self.symbol = self.symbol.trim().to_uppercase();
        if self.exit_price.is_some() && self.exit_date.is_some() {
            self.closed = true;
        }
        self
    }
}

/// Partial update of a stored trade. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub symbol: Option<String>,
    pub side: Option<TradeSide>,
    pub strategy: Option<String>,
    pub entry_date: Option<DateTime<Utc>>,
    pub exit_date: Option<DateTime<Utc>>,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub fees: Option<Decimal>,
    pub setup: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub risk_amount: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub closed: Option<bool>,
}

impl TradeUpdate {
    pub fn validate(&self) -> Result<(), JournalError> {
        if let Some(symbol) = &self.symbol {
            if symbol.trim().is_empty() {
                return Err(JournalError::invalid("symbol must not be empty"));
            }
        }
        require_positive("entry_price", self.entry_price)?;
        require_positive("exit_price", self.exit_price)?;
        require_positive("quantity", self.quantity)?;
        require_non_negative("fees", self.fees)?;
        require_non_negative("risk_amount", self.risk_amount)?;
        require_non_negative("stop_loss", self.stop_loss)?;
        require_non_negative("take_profit", self.take_profit)?;
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        self.symbol = self.symbol.map(|s| s.trim().to_uppercase());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.symbol.is_none()
            && self.side.is_none()
            && self.strategy.is_none()
            && self.entry_date.is_none()
            && self.exit_date.is_none()
            && self.entry_price.is_none()
            && self.exit_price.is_none()
            && self.quantity.is_none()
            && self.fees.is_none()
            && self.setup.is_none()
            && self.notes.is_none()
            && self.tags.is_none()
            && self.risk_amount.is_none()
            && self.stop_loss.is_none()
            && self.take_profit.is_none()
            && self.closed.is_none()
    }
}

fn require_positive(field: &str, value: Option<Decimal>) -> Result<(), JournalError> {
    match value {
        Some(v) if v <= Decimal::ZERO => Err(JournalError::invalid(format!(
            "{} must be greater than zero (got {})",
            field, v
        ))),
        _ => Ok(()),
    }
}

fn require_non_negative(field: &str, value: Option<Decimal>) -> Result<(), JournalError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(JournalError::invalid(format!(
            "{} must not be negative (got {})",
            field, v
        ))),
        _ => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pnl_long() {
        let trade = closed_trade(
            "AAPL",
            TradeSide::Long,
            dec!(100),
            dec!(110),
            dec!(10),
            dec!(5),
            at(2024, 3, 15),
        );

        // (110 - 100) * 10 - 5
        assert_eq!(trade.realized_pnl(), Some(dec!(95)));
    }

    #[test]
    fn test_pnl_short() {
        let trade = closed_trade(
            "ES",
            TradeSide::Short,
            dec!(100),
            dec!(90),
            dec!(5),
            dec!(2),
            at(2024, 3, 15),
        );

        // (100 - 90) * 5 - 2
        assert_eq!(trade.realized_pnl(), Some(dec!(48)));
    }

    #[test]
    fn test_pnl_losing_short_includes_fees() {
        let trade = closed_trade(
            "TSLA",
            TradeSide::Short,
            dec!(200),
            dec!(210),
            dec!(3),
            dec!(1.5),
            at(2024, 3, 15),
        );

        assert_eq!(trade.realized_pnl(), Some(dec!(-31.5)));
    }

    #[test]
    fn test_pnl_requires_fees() {
        let mut trade = with_pnl("AAPL", dec!(10), at(2024, 3, 15));
        trade.fees = None;

        assert_eq!(trade.realized_pnl(), None);
    }

    #[test]
    fn test_open_trade_has_no_pnl() {
        let mut trade = closed_trade(
            "AAPL",
            TradeSide::Long,
            dec!(100),
            dec!(110),
            dec!(10),
            dec!(0),
            at(2024, 3, 15),
        );
        trade.closed = false;

        // Exit data present but the trade is not marked closed
        assert_eq!(trade.realized_pnl(), None);
    }

    #[test]
    fn test_closed_trade_missing_fields_has_no_pnl() {
        let base = closed_trade(
            "AAPL",
            TradeSide::Long,
            dec!(100),
            dec!(110),
            dec!(10),
            dec!(0),
            at(2024, 3, 15),
        );

        let mut no_exit = base.clone();
        no_exit.exit_price = None;
        assert_eq!(no_exit.realized_pnl(), None);

        let mut no_entry = base.clone();
        no_entry.entry_price = None;
        assert_eq!(no_entry.realized_pnl(), None);

        let mut no_quantity = base;
        no_quantity.quantity = None;
        assert_eq!(no_quantity.realized_pnl(), None);
    }

    #[test]
    fn test_overflow_is_not_computable() {
        let trade = closed_trade(
            "BIG",
            TradeSide::Long,
            dec!(1),
            Decimal::MAX,
            Decimal::MAX,
            dec!(0),
            at(2024, 3, 15),
        );

        assert_eq!(trade.realized_pnl(), None);
    }

    #[test]
    fn test_strategy_label_ignores_empty() {
        let mut trade = with_pnl("AAPL", dec!(10), at(2024, 3, 15));
        assert_eq!(trade.strategy_label(), None);

        trade.strategy = Some(String::new());
        assert_eq!(trade.strategy_label(), None);

        trade.strategy = Some("breakout".to_string());
        assert_eq!(trade.strategy_label(), Some("breakout"));
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("long".parse::<TradeSide>().unwrap(), TradeSide::Long);
        assert_eq!(" SHORT ".parse::<TradeSide>().unwrap(), TradeSide::Short);
        assert!("buy".parse::<TradeSide>().is_err());
    }

    #[test]
    fn test_new_trade_normalization() {
        let mut trade = NewTrade::new("btcusdt ", TradeSide::Long, at(2024, 1, 2), dec!(42000), dec!(0.5));
        assert!(!trade.clone().normalized().closed);

        trade.exit_price = Some(dec!(43000));
        let normalized = trade.clone().normalized();
        assert_eq!(normalized.symbol, "BTCUSDT");
        // Exit price alone does not close the trade
        assert!(!normalized.closed);

        trade.exit_date = Some(at(2024, 1, 5));
        assert!(trade.normalized().closed);
    }

    #[test]
    fn test_new_trade_validation() {
        let valid = NewTrade::new("AAPL", TradeSide::Long, at(2024, 1, 2), dec!(150), dec!(10));
        assert!(valid.validate().is_ok());

        let mut bad_price = valid.clone();
        bad_price.entry_price = dec!(0);
        assert!(matches!(bad_price.validate(), Err(JournalError::InvalidArgument(_))));

        let mut bad_fees = valid.clone();
        bad_fees.fees = dec!(-1);
        assert!(bad_fees.validate().is_err());

        let mut bad_symbol = valid;
        bad_symbol.symbol = "   ".to_string();
        assert!(bad_symbol.validate().is_err());
    }

    #[test]
    fn test_update_validation_and_normalization() {
        let update = TradeUpdate {
            symbol: Some("msft".to_string()),
            exit_price: Some(dec!(-3)),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(!update.is_empty());
        assert_eq!(update.normalized().symbol.as_deref(), Some("MSFT"));
        assert!(TradeUpdate::default().is_empty());
    }
}
