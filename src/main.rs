//! Trade Journal
//!
//! Records discrete trades and reports realized P&L analytics: win rate,
//! profit factor, expectancy, monthly and daily buckets, and the cumulative
//! equity curve.

mod config;
mod db;
mod error;
mod journal;
mod metrics;
mod models;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::JournalConfig;
use crate::journal::{Journal, ListQuery, SummaryQuery};
use crate::metrics::{parse_timestamp, AnalyticsError};
use crate::models::{NewTrade, TradeRecord, TradeSide, TradeUpdate};

/// Trading journal CLI.
#[derive(Parser)]
#[command(name = "tradejournal")]
#[command(about = "Record trades and analyze realized performance", long_about = None)]
struct Cli {
    /// Database URL (defaults to DATABASE_URL or ./tradejournal.db)
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new trade
    Add {
        /// Instrument symbol (stored uppercase)
        symbol: String,

        /// Direction: long or short
        #[arg(long)]
        side: TradeSide,

        #[arg(long)]
        entry_price: Decimal,

        /// Position size in units
        #[arg(long)]
        quantity: Decimal,

        /// Entry time (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long, value_parser = parse_date_arg)]
        entry_date: Option<DateTime<Utc>>,

        #[arg(long)]
        exit_price: Option<Decimal>,

        /// Exit time; together with --exit-price marks the trade closed
        #[arg(long, value_parser = parse_date_arg)]
        exit_date: Option<DateTime<Utc>>,

        /// Total fees and commissions
        #[arg(long, default_value = "0")]
        fees: Decimal,

        #[arg(long)]
        strategy: Option<String>,

        #[arg(long)]
        setup: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Tag for filtering (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Planned risk in currency
        #[arg(long)]
        risk: Option<Decimal>,

        #[arg(long)]
        stop_loss: Option<Decimal>,

        #[arg(long)]
        take_profit: Option<Decimal>,

        /// Mark closed even without exit data
        #[arg(long)]
        closed: bool,
    },

    /// List trades
    List {
        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        strategy: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Only closed (true) or open (false) trades
        #[arg(long)]
        closed: Option<bool>,

        /// Maximum number of trades to show (1-1000)
        #[arg(short = 'n', long)]
        limit: Option<u32>,

        /// Number of trades to skip
        #[arg(long, default_value = "0")]
        skip: u32,

        /// Field to sort by, prefix with - for descending
        #[arg(long, default_value = "-entry_date", allow_hyphen_values = true)]
        sort: String,
    },

    /// Show a single trade
    Show {
        id: String,
    },

    /// Change fields of a trade
    Update {
        id: String,

        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        side: Option<TradeSide>,

        #[arg(long)]
        strategy: Option<String>,

        #[arg(long, value_parser = parse_date_arg)]
        entry_date: Option<DateTime<Utc>>,

        #[arg(long, value_parser = parse_date_arg)]
        exit_date: Option<DateTime<Utc>>,

        #[arg(long)]
        entry_price: Option<Decimal>,

        #[arg(long)]
        exit_price: Option<Decimal>,

        #[arg(long)]
        quantity: Option<Decimal>,

        #[arg(long)]
        fees: Option<Decimal>,

        #[arg(long)]
        setup: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Replace all tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        closed: Option<bool>,
    },

    /// Record the exit of an open trade
    Close {
        id: String,

        #[arg(long)]
        exit_price: Decimal,

        /// Exit time (defaults to now)
        #[arg(long, value_parser = parse_date_arg)]
        exit_date: Option<DateTime<Utc>>,
    },

    /// Delete a trade
    Delete {
        id: String,
    },

    /// Performance summary
    Summary {
        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        strategy: Option<String>,

        /// Earliest entry date
        #[arg(long)]
        start: Option<String>,

        /// Latest entry date
        #[arg(long)]
        end: Option<String>,
    },

    /// Realized P&L per day
    Calendar {
        /// First day (defaults to end minus the lookback)
        #[arg(long)]
        start: Option<String>,

        /// Last day (defaults to now)
        #[arg(long)]
        end: Option<String>,
    },

    /// Cumulative realized P&L, trade by trade
    Equity,

    /// Check database connectivity
    Status,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = JournalConfig::from_env()?;
    if let Some(database) = cli.database.clone() {
        config.database_url = database;
    }

    if let Commands::Config = cli.command {
        return print_config(&config, cli.json);
    }

    let journal = Journal::open(config).await?;
    let json = cli.json;

    match cli.command {
        Commands::Add {
            symbol,
            side,
            entry_price,
            quantity,
            entry_date,
            exit_price,
            exit_date,
            fees,
            strategy,
            setup,
            notes,
            tags,
            risk,
            stop_loss,
            take_profit,
            closed,
        } => {
            let mut trade = NewTrade::new(
                symbol,
                side,
                entry_date.unwrap_or_else(Utc::now),
                entry_price,
                quantity,
            );
            trade.exit_price = exit_price;
            trade.exit_date = exit_date;
            trade.fees = fees;
            trade.strategy = strategy;
            trade.setup = setup;
            trade.notes = notes;
            trade.tags = tags;
            trade.risk_amount = risk;
            trade.stop_loss = stop_loss;
            trade.take_profit = take_profit;
            trade.closed = closed;

            let stored = journal.create_trade(trade).await?;
            if json {
                print_json(&stored)?;
            } else {
                println!("Recorded trade {}", stored.id);
                print_trade(&stored);
            }
        }

        Commands::List {
            symbol,
            strategy,
            tag,
            closed,
            limit,
            skip,
            sort,
        } => {
            let query = ListQuery {
                symbol,
                strategy,
                tag,
                closed,
                sort: Some(sort),
                skip,
                limit,
            };
            let page = journal.list_trades(&query).await?;

            if json {
                print_json(&page)?;
            } else if page.items.is_empty() {
                println!("No trades found. Use 'tradejournal add' to record one.");
            } else {
                println!(
                    "\n{:<36} {:<10} {:<5} {:<12} {:>12} {:>12} {:>10} {:>12}",
                    "ID", "SYMBOL", "SIDE", "ENTRY", "ENTRY PX", "EXIT PX", "QTY", "P&L"
                );
                println!("{}", "-".repeat(118));

                for trade in &page.items {
                    println!(
                        "{:<36} {:<10} {:<5} {:<12} {:>12} {:>12} {:>10} {:>12}",
                        trade.id,
                        truncate(&trade.symbol, 10),
                        trade.side,
                        trade
                            .entry_date
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        optional(trade.entry_price),
                        optional(trade.exit_price),
                        optional(trade.quantity),
                        trade
                            .realized_pnl()
                            .map(|p| format!("{:.2}", p))
                            .unwrap_or_else(|| if trade.closed { "n/a" } else { "open" }.to_string()),
                    );
                }
                println!("\nShowing {} of {} trades", page.items.len(), page.total);
            }
        }

        Commands::Show { id } => {
            let trade = journal.get_trade(&id).await?;
            if json {
                print_json(&trade)?;
            } else {
                print_trade(&trade);
            }
        }

        Commands::Update {
            id,
            symbol,
            side,
            strategy,
            entry_date,
            exit_date,
            entry_price,
            exit_price,
            quantity,
            fees,
            setup,
            notes,
            tags,
            closed,
        } => {
            let update = TradeUpdate {
                symbol,
                side,
                strategy,
                entry_date,
                exit_date,
                entry_price,
                exit_price,
                quantity,
                fees,
                setup,
                notes,
                tags: if tags.is_empty() { None } else { Some(tags) },
                closed,
                ..Default::default()
            };
            if update.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }

            let trade = journal.update_trade(&id, update).await?;
            if json {
                print_json(&trade)?;
            } else {
                println!("Updated trade {}", trade.id);
                print_trade(&trade);
            }
        }

        Commands::Close {
            id,
            exit_price,
            exit_date,
        } => {
            let trade = journal
                .close_trade(&id, exit_price, exit_date.unwrap_or_else(Utc::now))
                .await?;
            if json {
                print_json(&trade)?;
            } else {
                println!("Closed trade {}", trade.id);
                print_trade(&trade);
            }
        }

        Commands::Delete { id } => {
            journal.delete_trade(&id).await?;
            if json {
                print_json(&serde_json::json!({ "ok": true }))?;
            } else {
                println!("Deleted trade {}", id);
            }
        }

        Commands::Summary {
            symbol,
            strategy,
            start,
            end,
        } => {
            info!("Computing performance summary");
            let query = SummaryQuery {
                symbol,
                strategy,
                start,
                end,
            };
            let report = journal.summary(&query).await?;

            if json {
                print_json(&report)?;
                return Ok(());
            }

            println!("\n=== Performance Summary ===");
            println!("Total Trades:   {}", report.total_trades);
            println!("Closed Trades:  {}", report.closed_trades);
            println!("With P&L:       {}", report.computable_trades());
            println!("Net P&L:        {:.2}", report.net_pnl);

            println!("\n--- Win/Loss ---");
            println!("Win Rate:       {:.1}%", report.win_rate);
            println!("Winning Trades: {}", report.winning_trades);
            println!("Losing Trades:  {}", report.losing_trades);
            println!("Avg Win:        {:.2}", report.avg_win);
            println!("Avg Loss:       {:.2}", report.avg_loss);
            println!("Profit Factor:  {}", format_ratio(report.profit_factor));
            println!("Expectancy:     {:.2}", report.expectancy);

            print_breakdown("By Symbol", &report.by_symbol);
            print_breakdown("By Strategy", &report.by_strategy);
            print_breakdown("Monthly", &report.monthly);
        }

        Commands::Calendar { start, end } => {
            let calendar = journal.calendar(start.as_deref(), end.as_deref()).await?;

            if json {
                print_json(&calendar)?;
                return Ok(());
            }

            println!("\n=== Daily P&L: {} to {} ===", calendar.start, calendar.end);
            if calendar.daily.is_empty() {
                println!("No closed trades in this window.");
            }
            for (day, pnl) in &calendar.daily {
                println!("  {}  {:>12.2}", day, pnl);
            }
        }

        Commands::Equity => {
            let points = journal.equity_curve().await?;

            if json {
                print_json(&serde_json::json!({ "points": points }))?;
                return Ok(());
            }

            println!("\n=== Equity Curve ({} trades) ===", points.len());
            for point in &points {
                println!("  {}  {:>12.2}", point.date, point.equity);
            }
        }

        Commands::Status => {
            let health = journal.health().await?;

            if json {
                print_json(&health)?;
                return Ok(());
            }

            println!("\n=== Journal Status ===");
            println!("Database:       {}", if health.connected { "Connected" } else { "Not connected" });
            println!("URL:            {}", journal.config().database_url);
            println!("Tables:         {}", health.tables.join(", "));
            println!("Trades:         {}", health.trade_count);
        }

        Commands::Config => unreachable!("handled before opening the database"),
    }

    Ok(())
}

fn parse_date_arg(raw: &str) -> Result<DateTime<Utc>, AnalyticsError> {
    parse_timestamp(raw)
}

fn print_config(config: &JournalConfig, json: bool) -> Result<()> {
    if json {
        return print_json(config);
    }

    println!("\n=== Journal Configuration ===\n");
    println!("Database URL:           {}", config.database_url);
    println!("Calendar Lookback:      {} days", config.calendar_lookback_days);
    println!("Default Page Size:      {}", config.default_page_limit);
    println!("Max Page Size:          {}", config.max_page_limit);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_trade(trade: &TradeRecord) {
    println!("\n=== {} {} ===", trade.symbol, trade.side);
    println!("ID:          {}", trade.id);
    println!("Strategy:    {}", trade.strategy.as_deref().unwrap_or("-"));
    println!("Entry:       {} @ {}", optional_date(trade.entry_date), optional(trade.entry_price));
    println!("Exit:        {} @ {}", optional_date(trade.exit_date), optional(trade.exit_price));
    println!("Quantity:    {}", optional(trade.quantity));
    println!("Fees:        {}", optional(trade.fees));
    println!("Closed:      {}", if trade.closed { "Yes" } else { "No" });
    if let Some(pnl) = trade.realized_pnl() {
        println!("P&L:         {:.2}", pnl);
    }
    if !trade.tags.is_empty() {
        println!("Tags:        {}", trade.tags.join(", "));
    }
    if let Some(notes) = &trade.notes {
        println!("Notes:       {}", notes);
    }
}

fn print_breakdown(title: &str, buckets: &std::collections::BTreeMap<String, Decimal>) {
    if buckets.is_empty() {
        return;
    }
    println!("\n--- {} ---", title);
    for (key, pnl) in buckets {
        println!("  {:<20} {:>12.2}", truncate(key, 20), pnl);
    }
}

fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn optional(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn optional_date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
