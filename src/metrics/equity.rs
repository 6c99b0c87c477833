//! Cumulative equity curve in order of trade realization.

use rust_decimal::Decimal;

use super::calculator::MetricsCalculator;
use crate::models::{EquityPoint, TradeRecord};

impl MetricsCalculator {
    /// Build the equity curve from closed trades.
    ///
    /// Trades are sorted by exit date first (stable, so same-instant exits keep
    /// their input order). Each computable trade emits one point, including
    /// several on the same day. Trades without P&L or an exit date are skipped
    /// and do not move the running total, which saturates at the `Decimal`
    /// bounds.
    pub fn equity_curve(trades: &[TradeRecord]) -> Vec<EquityPoint> {
        let mut sorted: Vec<&TradeRecord> = trades.iter().collect();
        sorted.sort_by_key(|t| t.exit_date);

        let mut equity = Decimal::ZERO;
        let mut points = Vec::with_capacity(sorted.len());

        for trade in sorted {
            let (Some(pnl), Some(exit_date)) = (Self::compute_pnl(trade), trade.exit_date) else {
                continue;
            };
            equity = equity.saturating_add(pnl);
            points.push(EquityPoint {
                date: exit_date.date_naive(),
                equity,
            });
        }

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    #[test]
    fn test_curve_sorts_by_exit_date() {
        let trades = vec![
            with_pnl("AAPL", dec!(-20), at(2024, 3, 20)),
            with_pnl("AAPL", dec!(100), at(2024, 3, 1)),
            with_pnl("AAPL", dec!(50), at(2024, 3, 10)),
        ];

        let curve = MetricsCalculator::equity_curve(&trades);

        let equities: Vec<Decimal> = curve.iter().map(|p| p.equity).collect();
        assert_eq!(equities, vec![dec!(100), dec!(150), dec!(130)]);
        assert_eq!(curve[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(curve.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_same_day_trades_emit_separate_points() {
        let trades = vec![
            with_pnl("AAPL", dec!(10), at(2024, 3, 1)),
            with_pnl("MSFT", dec!(5), at(2024, 3, 1) + Duration::hours(2)),
        ];

        let curve = MetricsCalculator::equity_curve(&trades);

        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].date, curve[1].date);
        assert_eq!(curve[1].equity, dec!(15));
    }

    #[test]
    fn test_uncomputable_trades_do_not_move_curve() {
        let mut no_quantity = with_pnl("AAPL", dec!(999), at(2024, 3, 2));
        no_quantity.quantity = None;
        let mut no_exit_date = with_pnl("AAPL", dec!(999), at(2024, 3, 3));
        no_exit_date.exit_date = None;

        let trades = vec![
            with_pnl("AAPL", dec!(10), at(2024, 3, 1)),
            no_quantity,
            no_exit_date,
            open_trade("AAPL", at(2024, 3, 4)),
            with_pnl("AAPL", dec!(-4), at(2024, 3, 5)),
        ];

        let curve = MetricsCalculator::equity_curve(&trades);

        assert_eq!(curve.len(), 2);
        assert_eq!(curve[1].equity, dec!(6));
    }

    #[test]
    fn test_final_equity_matches_net_pnl() {
        let trades = vec![
            with_pnl("AAPL", dec!(12.5), at(2024, 1, 3)),
            with_pnl("ES", dec!(-40), at(2024, 2, 7)),
            with_pnl("NQ", dec!(88), at(2024, 1, 15)),
            with_pnl("AAPL", dec!(-3.25), at(2024, 3, 1)),
        ];

        let curve = MetricsCalculator::equity_curve(&trades);
        let summary = MetricsCalculator::summarize(&trades);

        assert_eq!(curve.last().map(|p| p.equity), Some(summary.net_pnl));
        assert_eq!(curve, MetricsCalculator::equity_curve(&trades));
    }

    #[test]
    fn test_running_total_saturates() {
        let big = oversized_winner("BRK.A", at(2024, 1, 10));
        let single = MetricsCalculator::compute_pnl(&big).unwrap();

        let curve = MetricsCalculator::equity_curve(&[
            big.clone(),
            big,
            with_pnl("BRK.A", dec!(-1), at(2024, 1, 11)),
        ]);

        let equity: Vec<Decimal> = curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity, vec![single, Decimal::MAX, Decimal::MAX - dec!(1)]);
    }

    #[test]
    fn test_empty_curve() {
        assert!(MetricsCalculator::equity_curve(&[]).is_empty());
    }
}
