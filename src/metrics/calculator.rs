//! Calculator for journal performance metrics: win rate, profit factor,
//! expectancy and P&L breakdowns.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::ratios;
use crate::models::{SummaryReport, TradeRecord};

/// Bucket for trades recorded without a strategy label.
pub const UNLABELED_STRATEGY: &str = "Unlabeled";

/// Calculator for computing journal performance metrics.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Realized P&L for a single trade, `None` when not computable.
    pub fn compute_pnl(trade: &TradeRecord) -> Option<Decimal> {
        trade.realized_pnl()
    }

    /// Summarize an already-filtered set of trades.
    ///
    /// Open trades and closed trades whose P&L cannot be computed count towards
    /// the totals but are excluded from every P&L statistic.
    pub fn summarize(trades: &[TradeRecord]) -> SummaryReport {
        let mut report = SummaryReport::new();
        report.total_trades = trades.len();

        let closed: Vec<&TradeRecord> = trades.iter().filter(|t| t.closed).collect();
        report.closed_trades = closed.len();

        let realized: Vec<(&TradeRecord, Decimal)> = closed
            .into_iter()
            .filter_map(|t| Self::compute_pnl(t).map(|pnl| (t, pnl)))
            .collect();

        let pnls: Vec<Decimal> = realized.iter().map(|(_, pnl)| *pnl).collect();
        Self::calculate_pnl_metrics(&mut report, &pnls);
        Self::calculate_breakdowns(&mut report, &realized);

        report
    }

    /// Calculate P&L-related metrics from realized trade outcomes.
    fn calculate_pnl_metrics(report: &mut SummaryReport, pnls: &[Decimal]) {
        let (wins, losses): (Vec<Decimal>, Vec<Decimal>) =
            pnls.iter().copied().partition(|p| *p >= Decimal::ZERO);

        let gross_profit = ratios::total(&wins);
        let gross_loss = ratios::total(&losses);

        report.winning_trades = wins.len();
        report.losing_trades = losses.len();
        report.net_pnl = gross_profit.saturating_add(gross_loss);

        report.win_rate = ratios::percentage(wins.len(), pnls.len());
        report.avg_win = ratios::mean(gross_profit, wins.len());
        report.avg_loss = ratios::mean(gross_loss, losses.len());
        report.profit_factor =
            ratios::profit_factor(gross_profit, wins.len(), gross_loss, losses.len());
        report.expectancy =
            ratios::expectancy(wins.len(), pnls.len(), report.avg_win, report.avg_loss);
    }

    /// Group realized P&L by symbol, strategy and month.
    fn calculate_breakdowns(report: &mut SummaryReport, realized: &[(&TradeRecord, Decimal)]) {
        for (trade, pnl) in realized {
            accumulate(&mut report.by_symbol, trade.symbol.clone(), *pnl);

            let label = trade.strategy_label().unwrap_or(UNLABELED_STRATEGY);
            accumulate(&mut report.by_strategy, label.to_string(), *pnl);

            // Trades with neither date cannot be placed in a month
            if let Some(date) = trade.exit_date.or(trade.entry_date) {
                accumulate(&mut report.monthly, date.format("%Y-%m").to_string(), *pnl);
            }
        }
    }
}

pub(super) fn accumulate<K: Ord>(buckets: &mut BTreeMap<K, Decimal>, key: K, pnl: Decimal) {
    let bucket = buckets.entry(key).or_insert(Decimal::ZERO);
    *bucket = bucket.saturating_add(pnl);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::*;
    use crate::models::TradeSide;
    use rust_decimal_macros::dec;

    fn mixed_trades() -> Vec<TradeRecord> {
        let mut missing_exit = with_pnl("NVDA", dec!(1000), at(2024, 2, 9));
        missing_exit.exit_price = None;

        vec![
            closed_trade("AAPL", TradeSide::Long, dec!(100), dec!(110), dec!(10), dec!(5), at(2024, 1, 20)),
            closed_trade("ES", TradeSide::Short, dec!(100), dec!(90), dec!(5), dec!(2), at(2024, 2, 3)),
            closed_trade("AAPL", TradeSide::Long, dec!(50), dec!(45), dec!(10), dec!(0), at(2024, 2, 14)),
            open_trade("MSFT", at(2024, 2, 20)),
            missing_exit,
        ]
    }

    #[test]
    fn test_summarize_empty() {
        let report = MetricsCalculator::summarize(&[]);

        assert_eq!(report.total_trades, 0);
        assert_eq!(report.closed_trades, 0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.net_pnl, dec!(0));
        assert_eq!(report.avg_win, dec!(0));
        assert_eq!(report.avg_loss, dec!(0));
        assert_eq!(report.profit_factor, 0.0);
        assert_eq!(report.expectancy, dec!(0));
        assert!(report.by_symbol.is_empty());
        assert!(report.monthly.is_empty());
    }

    #[test]
    fn test_summarize_mixed() {
        let report = MetricsCalculator::summarize(&mixed_trades());

        assert_eq!(report.total_trades, 5);
        // The closed trade without an exit price still counts as closed
        assert_eq!(report.closed_trades, 4);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.losing_trades, 1);

        // Realized: 95, 48, -50
        assert_eq!(report.net_pnl, dec!(93));
        assert!((report.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.avg_win, dec!(71.5));
        assert_eq!(report.avg_loss, dec!(-50));
        assert!((report.profit_factor - 2.86).abs() < 1e-9);
        // 2/3 * 71.5 + 1/3 * -50
        assert_eq!(report.expectancy.round_dp(10), dec!(31));

        assert_eq!(report.by_symbol.get("AAPL"), Some(&dec!(45)));
        assert_eq!(report.by_symbol.get("ES"), Some(&dec!(48)));
        assert!(!report.by_symbol.contains_key("NVDA"));
        assert!(!report.by_symbol.contains_key("MSFT"));

        assert_eq!(report.monthly.get("2024-01"), Some(&dec!(95)));
        assert_eq!(report.monthly.get("2024-02"), Some(&dec!(-2)));
    }

    #[test]
    fn test_only_winners_has_infinite_profit_factor() {
        let trades = vec![
            with_pnl("AAPL", dec!(10), at(2024, 1, 2)),
            with_pnl("AAPL", dec!(0), at(2024, 1, 3)),
        ];

        let report = MetricsCalculator::summarize(&trades);

        assert!(report.profit_factor.is_infinite() && report.profit_factor > 0.0);
        // Break-even counts as a win
        assert_eq!(report.win_rate, 100.0);
        assert_eq!(report.avg_loss, dec!(0));
        assert_eq!(report.expectancy, dec!(5));
    }

    #[test]
    fn test_only_losers() {
        let trades = vec![
            with_pnl("AAPL", dec!(-10), at(2024, 1, 2)),
            with_pnl("AAPL", dec!(-30), at(2024, 1, 3)),
        ];

        let report = MetricsCalculator::summarize(&trades);

        assert_eq!(report.profit_factor, 0.0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.avg_win, dec!(0));
        assert_eq!(report.avg_loss, dec!(-20));
        assert_eq!(report.expectancy, dec!(-20));
    }

    #[test]
    fn test_unlabeled_strategy_bucket() {
        let mut labeled = with_pnl("AAPL", dec!(25), at(2024, 1, 2));
        labeled.strategy = Some("breakout".to_string());
        let mut blank = with_pnl("AAPL", dec!(-1), at(2024, 1, 4));
        blank.strategy = Some(String::new());

        let trades = vec![
            with_pnl("AAPL", dec!(10), at(2024, 1, 2)),
            with_pnl("MSFT", dec!(-3), at(2024, 1, 3)),
            labeled,
            blank,
        ];

        let report = MetricsCalculator::summarize(&trades);

        assert_eq!(report.by_strategy.get(UNLABELED_STRATEGY), Some(&dec!(6)));
        assert_eq!(report.by_strategy.get("breakout"), Some(&dec!(25)));
        assert_eq!(report.by_strategy.len(), 2);
    }

    #[test]
    fn test_two_unlabeled_trades_sum() {
        let trades = vec![
            with_pnl("AAPL", dec!(10), at(2024, 1, 2)),
            with_pnl("MSFT", dec!(-3), at(2024, 1, 3)),
        ];

        let report = MetricsCalculator::summarize(&trades);
        assert_eq!(report.by_strategy.get("Unlabeled"), Some(&dec!(7)));
    }

    #[test]
    fn test_monthly_uses_exit_date() {
        let mut trade = with_pnl("AAPL", dec!(50), at(2024, 1, 20));
        trade.entry_date = Some(at(2023, 12, 28));

        let report = MetricsCalculator::summarize(&[trade]);

        assert_eq!(report.monthly.get("2024-01"), Some(&dec!(50)));
        assert!(!report.monthly.contains_key("2023-12"));
    }

    #[test]
    fn test_monthly_falls_back_to_entry_date() {
        let mut no_exit_date = with_pnl("AAPL", dec!(12), at(2024, 5, 2));
        no_exit_date.exit_date = None;
        no_exit_date.entry_date = Some(at(2024, 4, 30));

        let mut undated = with_pnl("AAPL", dec!(8), at(2024, 5, 2));
        undated.exit_date = None;
        undated.entry_date = None;

        let report = MetricsCalculator::summarize(&[no_exit_date, undated]);

        assert_eq!(report.monthly.get("2024-04"), Some(&dec!(12)));
        assert_eq!(report.monthly.len(), 1);
        // The undated trade is still part of every other statistic
        assert_eq!(report.net_pnl, dec!(20));
        assert_eq!(report.by_symbol.get("AAPL"), Some(&dec!(20)));
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let trades = mixed_trades();
        assert_eq!(
            MetricsCalculator::summarize(&trades),
            MetricsCalculator::summarize(&trades)
        );
    }

    #[test]
    fn test_summary_saturates_instead_of_overflowing() {
        let big = oversized_winner("BRK.A", at(2024, 1, 10));
        assert!(MetricsCalculator::compute_pnl(&big).is_some());

        let report = MetricsCalculator::summarize(&[big.clone(), big, with_pnl("BRK.A", dec!(-1), at(2024, 1, 11))]);

        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.losing_trades, 1);
        assert_eq!(report.by_symbol.get("BRK.A"), Some(&(Decimal::MAX - dec!(1))));
        assert_eq!(report.monthly.get("2024-01"), Some(&(Decimal::MAX - dec!(1))));
        assert_eq!(report.net_pnl, Decimal::MAX - dec!(1));
        assert!(report.profit_factor > 1e28);
    }

    #[test]
    fn test_compute_pnl_delegates() {
        let trade = closed_trade("AAPL", TradeSide::Long, dec!(100), dec!(110), dec!(10), dec!(5), at(2024, 1, 20));
        assert_eq!(MetricsCalculator::compute_pnl(&trade), Some(dec!(95)));
    }
}
