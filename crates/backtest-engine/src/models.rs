use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use sentiment_signals::SignalConfig;

/// Strategy parameters. The defaults are the strategy's design constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Fraction of capital per position.
    pub position_size: f64,
    /// Fractional adverse move that closes a trade.
    pub stop_loss: f64,
    /// Fractional favorable move that closes a trade.
    pub take_profit: f64,
    pub use_trailing: bool,
    /// Give-back from the best favorable excursion that closes a trade when
    /// trailing is enabled.
    pub trail_giveup: f64,
    /// Flat per-side transaction cost in basis points.
    pub commission_bps: f64,
    pub signal: SignalConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            position_size: 0.65,
            stop_loss: 0.15,
            take_profit: 0.50,
            use_trailing: false,
            trail_giveup: 0.10,
            commission_bps: 2.0,
            signal: SignalConfig::default(),
        }
    }
}

impl StrategyConfig {
    pub fn per_side_cost(&self) -> f64 {
        self.commission_bps / 10_000.0
    }
}

/// A completed simulated trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ticker: String,
    /// Trading-day of entry.
    pub entry_date: NaiveDate,
    /// Trading-day of exit (stop, target, trailing stop, or the planned
    /// end of the inter-earnings window).
    pub exit_date: NaiveDate,
    /// +1 long, -1 short.
    pub side: i8,
    /// Realized fractional PnL: side * (exit_close / entry_close - 1).
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Full per-ticker backtest output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerBacktest {
    pub ticker: String,
    /// Cumulative net return multiples of the sentiment strategy, one per
    /// trading day, starting at 1.0.
    pub sentiment_curve: Vec<CurvePoint>,
    /// Buy-and-hold benchmark: close normalized to 1.0 at the first day.
    pub buy_hold_curve: Vec<CurvePoint>,
    pub trades: Vec<TradeRecord>,
}

/// One named column of the combined result table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnColumn {
    /// `{ticker}_sentiment` or `{ticker}_buyhold`.
    pub name: String,
    /// One value per table date; `None` where the ticker's calendar has no
    /// session.
    pub values: Vec<Option<f64>>,
}

/// Date-indexed union table: two columns per ticker over the union of the
/// per-ticker trading calendars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<ReturnColumn>,
}

impl ReturnTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Last observed value of a column, if any.
    pub fn final_value(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.values.iter().rev().find_map(|v| *v))
    }
}
