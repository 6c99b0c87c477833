//! Database persistence for journal trades.
//!
//! Decimals are stored as TEXT so values round-trip exactly. Timestamps are
//! fixed-width RFC 3339 UTC strings, which keeps string comparison and
//! ordering in SQL chronological.

mod query;

pub use query::{Page, SortField, SortSpec, TradeFilter};

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{NewTrade, TradeRecord, TradeSide, TradeUpdate};

const TRADE_COLUMNS: &str = "id, symbol, side, strategy, entry_date, exit_date, entry_price, \
     exit_price, quantity, fees, setup, notes, tags, risk_amount, stop_loss, take_profit, \
     closed, created_at, updated_at";

/// Database connection pool for the trade journal.
pub struct Database {
    pool: SqlitePool,
}

/// Raw trade row as stored in SQLite.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredTrade {
    pub id: String,
    pub symbol: String,
    pub side: String,
    pub strategy: Option<String>,
    pub entry_date: String,
    pub exit_date: Option<String>,
    pub entry_price: Option<String>,
    pub exit_price: Option<String>,
    pub quantity: String,
    pub fees: String,
    pub setup: Option<String>,
    pub notes: Option<String>,
    pub tags: String,
    pub risk_amount: Option<String>,
    pub stop_loss: Option<String>,
    pub take_profit: Option<String>,
    pub closed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of probing the store.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreHealth {
    pub connected: bool,
    pub tables: Vec<String>,
    pub trade_count: i64,
}

impl Database {
    /// Create a new database connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        // Every connection to an in-memory database gets its own copy, so the
        // pool must hold exactly one and never recycle it.
        let in_memory = database_url.contains(":memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run all database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL CHECK (side IN ('long', 'short')),
                strategy TEXT,
                entry_date TEXT NOT NULL,
                exit_date TEXT,
                entry_price TEXT,
                exit_price TEXT,
                quantity TEXT NOT NULL,
                fees TEXT NOT NULL DEFAULT '0',
                setup TEXT,
                notes TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                risk_amount TEXT,
                stop_loss TEXT,
                take_profit TEXT,
                closed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Indexes
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades(symbol)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_strategy ON trades(strategy)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_entry_date ON trades(entry_date)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_exit_date ON trades(closed, exit_date)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== Trades ====================

    /// Insert a new trade and return it as stored.
    pub async fn insert_trade(&self, trade: &NewTrade) -> Result<TradeRecord> {
        let id = Uuid::new_v4().to_string();
        let now = encode_time(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO trades (
                id, symbol, side, strategy, entry_date, exit_date, entry_price, exit_price,
                quantity, fees, setup, notes, tags, risk_amount, stop_loss, take_profit,
                closed, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&trade.symbol)
        .bind(trade.side.as_str())
        .bind(&trade.strategy)
        .bind(encode_time(&trade.entry_date))
        .bind(trade.exit_date.as_ref().map(encode_time))
        .bind(trade.entry_price.to_string())
        .bind(trade.exit_price.map(|p| p.to_string()))
        .bind(trade.quantity.to_string())
        .bind(trade.fees.to_string())
        .bind(&trade.setup)
        .bind(&trade.notes)
        .bind(serde_json::to_string(&trade.tags)?)
        .bind(trade.risk_amount.map(|v| v.to_string()))
        .bind(trade.stop_loss.map(|v| v.to_string()))
        .bind(trade.take_profit.map(|v| v.to_string()))
        .bind(trade.closed)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to insert trade")?;

        debug!(id = %id, symbol = %trade.symbol, "Trade inserted");

        self.get_trade(&id)
            .await?
            .with_context(|| format!("Trade {} missing after insert", id))
    }

    /// Get a single trade by ID.
    pub async fn get_trade(&self, id: &str) -> Result<Option<TradeRecord>> {
        let row = sqlx::query_as::<_, StoredTrade>(&format!(
            "SELECT {} FROM trades WHERE id = ?",
            TRADE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch trade")?;

        row.map(StoredTrade::into_record).transpose()
    }

    /// Apply a partial update. Returns `None` if no trade has this ID.
    pub async fn update_trade(&self, id: &str, update: &TradeUpdate) -> Result<Option<TradeRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE trades SET updated_at = ");
        qb.push_bind(encode_time(&Utc::now()));

        if let Some(symbol) = &update.symbol {
            qb.push(", symbol = ").push_bind(symbol.clone());
        }
        if let Some(side) = update.side {
            qb.push(", side = ").push_bind(side.as_str());
        }
        if let Some(strategy) = &update.strategy {
            qb.push(", strategy = ").push_bind(strategy.clone());
        }
        if let Some(entry_date) = &update.entry_date {
            qb.push(", entry_date = ").push_bind(encode_time(entry_date));
        }
        if let Some(exit_date) = &update.exit_date {
            qb.push(", exit_date = ").push_bind(encode_time(exit_date));
        }
        push_decimal(&mut qb, "entry_price", update.entry_price);
        push_decimal(&mut qb, "exit_price", update.exit_price);
        push_decimal(&mut qb, "quantity", update.quantity);
        push_decimal(&mut qb, "fees", update.fees);
        if let Some(setup) = &update.setup {
            qb.push(", setup = ").push_bind(setup.clone());
        }
        if let Some(notes) = &update.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        if let Some(tags) = &update.tags {
            qb.push(", tags = ").push_bind(serde_json::to_string(tags)?);
        }
        push_decimal(&mut qb, "risk_amount", update.risk_amount);
        push_decimal(&mut qb, "stop_loss", update.stop_loss);
        push_decimal(&mut qb, "take_profit", update.take_profit);
        if let Some(closed) = update.closed {
            qb.push(", closed = ").push_bind(closed);
        }

        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to update trade")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_trade(id).await
    }

    /// Delete a trade. Returns whether a row was removed.
    pub async fn delete_trade(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM trades WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete trade")?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch all trades matching a filter, optionally sorted and paged.
    pub async fn find_trades(
        &self,
        filter: &TradeFilter,
        sort: Option<SortSpec>,
        page: Option<Page>,
    ) -> Result<Vec<TradeRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM trades", TRADE_COLUMNS));
        filter.push_where(&mut qb);
        if let Some(sort) = sort {
            sort.push_order_by(&mut qb);
        }
        if let Some(page) = page {
            page.push_limit(&mut qb);
        }

        let rows: Vec<StoredTrade> = qb
            .build_query_as::<StoredTrade>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch trades")?;

        rows.into_iter().map(StoredTrade::into_record).collect()
    }

    /// Count trades matching a filter.
    pub async fn count_trades(&self, filter: &TradeFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM trades");
        filter.push_where(&mut qb);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count trades")
    }

    // ==================== Health ====================

    /// Check connectivity and list the first few tables.
    pub async fn health(&self) -> Result<StoreHealth> {
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tables")?;

        let trade_count = self.count_trades(&TradeFilter::default()).await?;

        Ok(StoreHealth {
            connected: !self.pool.is_closed(),
            tables: tables.into_iter().map(|(name,)| name).collect(),
            trade_count,
        })
    }

    /// Get the connection pool (for advanced queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StoredTrade {
    /// Decode a row into a trade record.
    ///
    /// Prices, quantity, fees and dates that fail to decode become absent so
    /// that a single bad row only drops out of the P&L statistics. Only an
    /// unknown side is an error.
    pub fn into_record(self) -> Result<TradeRecord> {
        let side = TradeSide::from_str(&self.side)
            .with_context(|| format!("Trade {} has invalid side", self.id))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags).unwrap_or_else(|e| {
            warn!(id = %self.id, error = %e, "Ignoring undecodable tags");
            Vec::new()
        });

        let id = self.id.as_str();
        Ok(TradeRecord {
            entry_date: decode_time(id, "entry_date", Some(self.entry_date.as_str())),
            exit_date: decode_time(id, "exit_date", self.exit_date.as_deref()),
            entry_price: decode_decimal(id, "entry_price", self.entry_price.as_deref()),
            exit_price: decode_decimal(id, "exit_price", self.exit_price.as_deref()),
            quantity: decode_decimal(id, "quantity", Some(self.quantity.as_str())),
            fees: decode_decimal(id, "fees", Some(self.fees.as_str())),
            risk_amount: decode_decimal(id, "risk_amount", self.risk_amount.as_deref()),
            stop_loss: decode_decimal(id, "stop_loss", self.stop_loss.as_deref()),
            take_profit: decode_decimal(id, "take_profit", self.take_profit.as_deref()),
            created_at: decode_time(id, "created_at", Some(self.created_at.as_str())),
            updated_at: decode_time(id, "updated_at", Some(self.updated_at.as_str())),
            side,
            tags,
            closed: self.closed,
            symbol: self.symbol,
            strategy: self.strategy,
            setup: self.setup,
            notes: self.notes,
            id: self.id,
        })
    }
}

/// Format a timestamp for storage: `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub(crate) fn encode_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(id: &str, column: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(id = %id, column = column, value = raw, error = %e, "Ignoring undecodable timestamp");
            None
        }
    }
}

fn decode_decimal(id: &str, column: &str, raw: Option<&str>) -> Option<Decimal> {
    let raw = raw?;
    match Decimal::from_str(raw.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(id = %id, column = column, value = raw, error = %e, "Ignoring undecodable number");
            None
        }
    }
}

fn push_decimal(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, value: Option<Decimal>) {
    if let Some(value) = value {
        qb.push(format!(", {} = ", column)).push_bind(value.to_string());
    }
}
