//! Zero-count policy for every ratio in the summary report.
//!
//! | metric          | condition                 | result        |
//! |-----------------|---------------------------|---------------|
//! | win rate        | no computable trades      | 0             |
//! | average win     | no wins                   | 0             |
//! | average loss    | no losses                 | 0             |
//! | profit factor   | wins and losses           | wins / \|losses\| |
//! | profit factor   | wins, no losses           | +infinity     |
//! | profit factor   | no wins                   | 0             |
//! | expectancy      | no computable trades      | 0             |
//!
//! Sums saturate at `Decimal::MIN` / `Decimal::MAX` instead of overflowing.
//! A profit factor too large for `Decimal` is +infinity.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Saturating sum of P&L values.
pub fn total(values: &[Decimal]) -> Decimal {
    values
        .iter()
        .fold(Decimal::ZERO, |acc, value| acc.saturating_add(*value))
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Arithmetic mean of a sum over `count` values, or 0 when there are none.
pub fn mean(sum: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    sum / Decimal::from(count)
}

/// Gross profit over absolute gross loss.
pub fn profit_factor(gross_profit: Decimal, wins: usize, gross_loss: Decimal, losses: usize) -> f64 {
    match (wins, losses) {
        (0, _) => 0.0,
        (_, 0) => f64::INFINITY,
        _ => {
            gross_profit
                .checked_div(gross_loss.abs())
                .and_then(|ratio| ratio.to_f64())
                .unwrap_or(f64::INFINITY)
        }
    }
}

/// `p * avg_win + (1 - p) * avg_loss` where `p = wins / total`.
pub fn expectancy(wins: usize, total: usize, avg_win: Decimal, avg_loss: Decimal) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    let p_win = Decimal::from(wins) / Decimal::from(total);
    p_win
        .saturating_mul(avg_win)
        .saturating_add((Decimal::ONE - p_win).saturating_mul(avg_loss))
}
