use call_core::DailyClose;

use crate::calendar::TradingCalendar;
use crate::models::TradeRecord;

/// Daily percentage returns of the close series; the first day's return is 0.
pub fn daily_returns(closes: &[DailyClose]) -> Vec<f64> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                0.0
            } else {
                c.close / closes[i - 1].close - 1.0
            }
        })
        .collect()
}

/// Per-day transaction costs: the flat per-side cost is charged on every
/// trade entry day and every exit day, additively when several fall on the
/// same session.
pub fn cost_series(
    calendar: &TradingCalendar,
    trades: &[TradeRecord],
    per_side_cost: f64,
) -> Vec<f64> {
    let mut costs = vec![0.0; calendar.len()];
    for trade in trades {
        if let Some(i) = calendar.index_of(trade.entry_date) {
            costs[i] -= per_side_cost;
        }
        if let Some(i) = calendar.index_of(trade.exit_date) {
            costs[i] -= per_side_cost;
        }
    }
    costs
}

/// Cumulative product of (1 + position * return + cost), base 1.0.
pub fn equity_curve(positions: &[f64], returns: &[f64], costs: &[f64]) -> Vec<f64> {
    let mut equity = 1.0;
    positions
        .iter()
        .zip(returns)
        .zip(costs)
        .map(|((pos, ret), cost)| {
            let net = pos * ret + cost;
            equity *= 1.0 + net;
            equity
        })
        .collect()
}

/// Benchmark: the close series normalized to 1.0 at its first observation.
pub fn buy_hold_curve(closes: &[DailyClose]) -> Vec<f64> {
    match closes.first() {
        Some(first) => closes.iter().map(|c| c.close / first.close).collect(),
        None => Vec::new(),
    }
}
