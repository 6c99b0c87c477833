//! Filters, sort order and paging for trade queries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use super::encode_time;
use crate::error::JournalError;

/// Equality and range filters on stored trades. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeFilter {
    /// Matched case-insensitively (symbols are stored uppercase)
    pub symbol: Option<String>,
    pub strategy: Option<String>,
    /// Trade must carry this tag
    pub tag: Option<String>,
    pub closed: Option<bool>,
    pub entry_from: Option<DateTime<Utc>>,
    pub entry_to: Option<DateTime<Utc>>,
    pub exit_from: Option<DateTime<Utc>>,
    pub exit_to: Option<DateTime<Utc>>,
    /// Only trades with an exit price
    pub require_exit_price: bool,
}

impl TradeFilter {
    /// Append a WHERE clause for this filter. Values are always bound.
    pub(crate) fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");

        if let Some(symbol) = &self.symbol {
            qb.push(" AND symbol = ").push_bind(symbol.trim().to_uppercase());
        }
        if let Some(strategy) = &self.strategy {
            qb.push(" AND strategy = ").push_bind(strategy.clone());
        }
        if let Some(tag) = &self.tag {
            qb.push(" AND EXISTS (SELECT 1 FROM json_each(trades.tags) WHERE json_each.value = ")
                .push_bind(tag.clone())
                .push(")");
        }
        if let Some(closed) = self.closed {
            qb.push(" AND closed = ").push_bind(closed);
        }
        if let Some(from) = &self.entry_from {
            qb.push(" AND entry_date >= ").push_bind(encode_time(from));
        }
        if let Some(to) = &self.entry_to {
            qb.push(" AND entry_date <= ").push_bind(encode_time(to));
        }
        if let Some(from) = &self.exit_from {
            qb.push(" AND exit_date >= ").push_bind(encode_time(from));
        }
        if let Some(to) = &self.exit_to {
            qb.push(" AND exit_date <= ").push_bind(encode_time(to));
        }
        if self.require_exit_price {
            qb.push(" AND exit_price IS NOT NULL");
        }
    }
}

/// Column a trade listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    EntryDate,
    ExitDate,
    Symbol,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::EntryDate => "entry_date",
            SortField::ExitDate => "exit_date",
            SortField::Symbol => "symbol",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

/// Sort order, parsed from strings like `entry_date` or `-entry_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    pub(crate) fn push_order_by(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let direction = if self.descending { "DESC" } else { "ASC" };
        qb.push(format!(
            " ORDER BY {} {}, rowid {}",
            self.field.column(),
            direction,
            direction
        ));
    }
}

impl FromStr for SortSpec {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let field = match name {
            "entry_date" => SortField::EntryDate,
            "exit_date" => SortField::ExitDate,
            "symbol" => SortField::Symbol,
            "created_at" => SortField::CreatedAt,
            "updated_at" => SortField::UpdatedAt,
            other => {
                return Err(JournalError::invalid(format!(
                    "cannot sort by '{}' (expected entry_date, exit_date, symbol, created_at or updated_at)",
                    other
                )))
            }
        };

        Ok(Self { field, descending })
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-")?;
        }
        f.write_str(self.field.column())
    }
}

/// Offset/limit window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    /// Build a page with `limit` clamped to `1..=max_limit`.
    pub fn new(skip: u32, limit: u32, max_limit: u32) -> Self {
        Self {
            skip,
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    pub(crate) fn push_limit(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" LIMIT ")
            .push_bind(i64::from(self.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(self.skip));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_spec_parsing() {
        let spec: SortSpec = "-entry_date".parse().unwrap();
        assert_eq!(spec, SortSpec::descending(SortField::EntryDate));
        assert_eq!(spec.to_string(), "-entry_date");

        let spec: SortSpec = "symbol".parse().unwrap();
        assert_eq!(spec, SortSpec::ascending(SortField::Symbol));
    }

    #[test]
    fn test_sort_spec_rejects_unknown_fields() {
        assert!(matches!(
            "-notes; DROP TABLE trades".parse::<SortSpec>(),
            Err(JournalError::InvalidArgument(_))
        ));
        assert!("".parse::<SortSpec>().is_err());
    }

    #[test]
    fn test_page_clamp() {
        assert_eq!(Page::new(0, 0, 1000).limit, 1);
        assert_eq!(Page::new(0, 5000, 1000).limit, 1000);
        assert_eq!(Page::new(20, 50, 1000), Page { skip: 20, limit: 50 });
    }

    #[test]
    fn test_filter_sql() {
        let filter = TradeFilter {
            symbol: Some("aapl".to_string()),
            tag: Some("earnings".to_string()),
            closed: Some(true),
            require_exit_price: true,
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM trades");
        filter.push_where(&mut qb);
        let sql = qb.sql().to_string();

        assert!(sql.contains("symbol = ?"));
        assert!(sql.contains("json_each(trades.tags)"));
        assert!(sql.contains("closed = ?"));
        assert!(sql.contains("exit_price IS NOT NULL"));
        assert!(!sql.contains("strategy"));
    }
}
