use call_core::DailyClose;
use sentiment_signals::SignalPoint;

use crate::calendar::TradingCalendar;
use crate::models::{StrategyConfig, TradeRecord};

#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// One position value per trading day: 0 outside trade windows,
    /// side * position_size inside (exit day inclusive).
    pub positions: Vec<f64>,
    pub trades: Vec<TradeRecord>,
}

/// Walk the signal events forward through the trading calendar.
///
/// Each nonzero signal opens a position at its mapped entry day and holds
/// until stop-loss, take-profit, trailing stop, or the planned end of the
/// window: the entry day of the next later signal event, else the last
/// session. Events are processed in chronological order; where windows
/// touch, the later event's entry day wins.
pub fn simulate(
    ticker: &str,
    signals: &[SignalPoint],
    calendar: &TradingCalendar,
    closes: &[DailyClose],
    config: &StrategyConfig,
) -> SimulationOutcome {
    let n = calendar.len();
    let mut positions = vec![0.0; n];
    let mut trades = Vec::new();
    if n == 0 {
        return SimulationOutcome { positions, trades };
    }
    debug_assert_eq!(closes.len(), n);

    // Nonzero signals with a resolvable entry day.
    let events: Vec<(usize, i8)> = signals
        .iter()
        .filter(|s| s.signal != 0)
        .filter_map(|s| calendar.entry_index(s.date).map(|i| (i, s.signal)))
        .collect();

    for (k, &(entry, side)) in events.iter().enumerate() {
        // Planned exit: entry of the next event strictly after this one.
        let exit_plan = events[k + 1..]
            .iter()
            .map(|&(e, _)| e)
            .find(|&e| e > entry)
            .unwrap_or(n - 1);
        let exit_plan = exit_plan.max(entry);

        let s = f64::from(side);
        let entry_price = closes[entry].close;
        let mut best_fav = 0.0;
        let mut actual_exit = exit_plan;

        for d in entry..=exit_plan {
            let pnl = s * (closes[d].close / entry_price - 1.0);
            if pnl > best_fav {
                best_fav = pnl;
            }

            let stopped = if pnl <= -config.stop_loss {
                true
            } else if pnl >= config.take_profit {
                true
            } else {
                config.use_trailing && best_fav > 0.0 && best_fav - pnl >= config.trail_giveup
            };

            positions[d] = s * config.position_size;
            if stopped {
                actual_exit = d;
                break;
            }
        }

        // Flat between an early exit and the next earnings event. The next
        // event's own loop re-sets its entry day.
        for day in positions.iter_mut().take(exit_plan + 1).skip(actual_exit + 1) {
            *day = 0.0;
        }

        trades.push(TradeRecord {
            ticker: ticker.to_string(),
            entry_date: calendar.day(entry),
            exit_date: calendar.day(actual_exit),
            side,
            pnl: s * (closes[actual_exit].close / entry_price - 1.0),
        });
    }

    SimulationOutcome { positions, trades }
}
