//! Journal service: turns requests into store queries and runs the analytics
//! engine over the results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::JournalConfig;
use crate::db::{Database, Page, SortField, SortSpec, StoreHealth, TradeFilter};
use crate::error::JournalError;
use crate::metrics::{parse_timestamp, CalendarWindow, MetricsCalculator};
use crate::models::{DailyCalendar, EquityPoint, NewTrade, SummaryReport, TradeRecord, TradeUpdate};

/// Filters accepted by the summary report. Dates bound `entry_date`.
#[derive(Debug, Clone, Default)]
pub struct SummaryQuery {
    pub symbol: Option<String>,
    pub strategy: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Filters accepted by the trade listing.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub symbol: Option<String>,
    pub strategy: Option<String>,
    pub tag: Option<String>,
    pub closed: Option<bool>,
    /// Field to sort by, prefixed with `-` for descending
    pub sort: Option<String>,
    pub skip: u32,
    pub limit: Option<u32>,
}

/// One page of a trade listing plus the total number of matches.
#[derive(Debug, Clone, Serialize)]
pub struct TradePage {
    pub items: Vec<TradeRecord>,
    pub total: i64,
}

/// The trade journal: persistence plus analytics.
pub struct Journal {
    db: Database,
    config: JournalConfig,
}

impl Journal {
    pub fn new(db: Database, config: JournalConfig) -> Self {
        Self { db, config }
    }

    /// Connect to the configured database.
    pub async fn open(config: JournalConfig) -> Result<Self, JournalError> {
        let db = Database::new(&config.database_url).await?;
        Ok(Self::new(db, config))
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    // ==================== Trades ====================

    /// Validate, normalize and store a new trade.
    pub async fn create_trade(&self, trade: NewTrade) -> Result<TradeRecord, JournalError> {
        trade.validate()?;
        let trade = trade.normalized();
        let stored = self.db.insert_trade(&trade).await?;

        info!(id = %stored.id, symbol = %stored.symbol, side = %stored.side, "Trade recorded");
        Ok(stored)
    }

    pub async fn get_trade(&self, id: &str) -> Result<TradeRecord, JournalError> {
        self.db
            .get_trade(id)
            .await?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))
    }

    pub async fn update_trade(&self, id: &str, update: TradeUpdate) -> Result<TradeRecord, JournalError> {
        update.validate()?;
        let update = update.normalized();

        let updated = self
            .db
            .update_trade(id, &update)
            .await?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))?;

        info!(id = %id, "Trade updated");
        Ok(updated)
    }

    /// Record the exit of a trade and mark it closed.
    pub async fn close_trade(
        &self,
        id: &str,
        exit_price: Decimal,
        exit_date: DateTime<Utc>,
    ) -> Result<TradeRecord, JournalError> {
        let update = TradeUpdate {
            exit_price: Some(exit_price),
            exit_date: Some(exit_date),
            closed: Some(true),
            ..Default::default()
        };
        self.update_trade(id, update).await
    }

    pub async fn delete_trade(&self, id: &str) -> Result<(), JournalError> {
        if !self.db.delete_trade(id).await? {
            return Err(JournalError::NotFound(id.to_string()));
        }

        info!(id = %id, "Trade deleted");
        Ok(())
    }

    /// List trades, newest entry first unless another order is requested.
    pub async fn list_trades(&self, query: &ListQuery) -> Result<TradePage, JournalError> {
        let filter = TradeFilter {
            symbol: query.symbol.clone(),
            strategy: query.strategy.clone(),
            tag: query.tag.clone(),
            closed: query.closed,
            ..Default::default()
        };
        let sort = match &query.sort {
            Some(raw) => raw.parse::<SortSpec>()?,
            None => SortSpec::descending(SortField::EntryDate),
        };
        let page = Page::new(
            query.skip,
            query.limit.unwrap_or(self.config.default_page_limit),
            self.config.max_page_limit,
        );

        debug!(sort = %sort, skip = page.skip, limit = page.limit, "Listing trades");
        let items = self.db.find_trades(&filter, Some(sort), Some(page)).await?;
        let total = self.db.count_trades(&filter).await?;

        Ok(TradePage { items, total })
    }

    // ==================== Analytics ====================

    /// Summary statistics over trades matching the query.
    pub async fn summary(&self, query: &SummaryQuery) -> Result<SummaryReport, JournalError> {
        let filter = TradeFilter {
            symbol: query.symbol.clone(),
            strategy: query.strategy.clone(),
            entry_from: query.start.as_deref().map(parse_timestamp).transpose()?,
            entry_to: query.end.as_deref().map(parse_timestamp).transpose()?,
            ..Default::default()
        };

        let trades = self.db.find_trades(&filter, None, None).await?;
        debug!(trades = trades.len(), ?filter, "Computing summary");

        Ok(MetricsCalculator::summarize(&trades))
    }

    /// Daily realized P&L between `start` and `end`.
    pub async fn calendar(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<DailyCalendar, JournalError> {
        let window =
            CalendarWindow::resolve(start, end, Utc::now(), self.config.calendar_lookback_days)?;
        let filter = TradeFilter {
            closed: Some(true),
            exit_from: Some(window.start),
            exit_to: Some(window.end),
            ..Default::default()
        };

        let trades = self.db.find_trades(&filter, None, None).await?;
        debug!(trades = trades.len(), start = %window.start, end = %window.end, "Computing calendar");

        Ok(MetricsCalculator::daily_pnl(&trades, &window))
    }

    /// Cumulative equity over every closed trade with an exit price.
    pub async fn equity_curve(&self) -> Result<Vec<EquityPoint>, JournalError> {
        let filter = TradeFilter {
            closed: Some(true),
            require_exit_price: true,
            ..Default::default()
        };

        let trades = self
            .db
            .find_trades(&filter, Some(SortSpec::ascending(SortField::ExitDate)), None)
            .await?;
        debug!(trades = trades.len(), "Computing equity curve");

        Ok(MetricsCalculator::equity_curve(&trades))
    }

    pub async fn health(&self) -> Result<StoreHealth, JournalError> {
        Ok(self.db.health().await?)
    }
}
