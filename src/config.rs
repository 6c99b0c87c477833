//! Journal configuration.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::metrics::{CalendarWindow, DEFAULT_LOOKBACK_DAYS};

/// Configuration for storage, listings and analytics windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// SQLite connection URL
    pub database_url: String,

    /// Days covered by the calendar when no start date is given
    pub calendar_lookback_days: i64,

    /// Page size for trade listings when none is requested
    pub default_page_limit: u32,

    /// Upper bound on a listing page
    pub max_page_limit: u32,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./tradejournal.db?mode=rwc".to_string(),
            calendar_lookback_days: DEFAULT_LOOKBACK_DAYS,
            default_page_limit: 200,
            max_page_limit: 1000,
        }
    }
}

impl JournalConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup, falling back to defaults for unset keys.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(days) = lookup("CALENDAR_LOOKBACK_DAYS") {
            config.calendar_lookback_days = days
                .trim()
                .parse()
                .with_context(|| format!("Invalid CALENDAR_LOOKBACK_DAYS '{}'", days))?;
            anyhow::ensure!(
                config.calendar_lookback_days >= 0,
                "CALENDAR_LOOKBACK_DAYS must not be negative"
            );
            CalendarWindow::resolve(None, None, Utc::now(), config.calendar_lookback_days)
                .context("Invalid CALENDAR_LOOKBACK_DAYS")?;
        }
        if let Some(limit) = lookup("PAGE_LIMIT") {
            config.default_page_limit = limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid PAGE_LIMIT '{}'", limit))?;
        }
        config.default_page_limit = config.default_page_limit.clamp(1, config.max_page_limit);

        Ok(config)
    }
}
