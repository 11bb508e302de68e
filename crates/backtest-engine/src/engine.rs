use std::collections::{BTreeMap, HashMap};

use call_core::{DailyClose, ScoredCall};
use rayon::prelude::*;
use sentiment_signals::{generate_signals, overall_series, SentimentPoint};

use crate::calendar::TradingCalendar;
use crate::models::{
    CurvePoint, ReturnColumn, ReturnTable, StrategyConfig, TickerBacktest,
};
use crate::returns;
use crate::simulator;

/// Signal-to-equity backtesting engine. Per-ticker runs are independent and
/// executed in parallel; a single ticker's data problem never fails the run.
pub struct BacktestEngine {
    config: StrategyConfig,
}

impl BacktestEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Backtest one ticker's overall-sentiment series against its close
    /// history. `None` when there is no price data to trade against.
    pub fn run_ticker(
        &self,
        ticker: &str,
        series: &[SentimentPoint],
        closes: &[DailyClose],
    ) -> Option<TickerBacktest> {
        let mut closes = closes.to_vec();
        closes.sort_by_key(|c| c.date);
        closes.dedup_by_key(|c| c.date);
        if closes.is_empty() {
            return None;
        }

        let calendar = TradingCalendar::from_closes(&closes);
        let signals = generate_signals(series, &self.config.signal);
        let outcome = simulator::simulate(ticker, &signals, &calendar, &closes, &self.config);

        let rets = returns::daily_returns(&closes);
        let costs = returns::cost_series(&calendar, &outcome.trades, self.config.per_side_cost());
        let sentiment = returns::equity_curve(&outcome.positions, &rets, &costs);
        let buy_hold = returns::buy_hold_curve(&closes);

        tracing::debug!(
            "{}: {} signals, {} trades, final multiple {:.4}",
            ticker,
            signals.iter().filter(|s| s.signal != 0).count(),
            outcome.trades.len(),
            sentiment.last().copied().unwrap_or(1.0)
        );

        Some(TickerBacktest {
            ticker: ticker.to_string(),
            sentiment_curve: zip_curve(&closes, &sentiment),
            buy_hold_curve: zip_curve(&closes, &buy_hold),
            trades: outcome.trades,
        })
    }

    /// Run the whole sentiment table: group calls per ticker, backtest each
    /// against its price history, and combine the curves into one
    /// date-indexed table. Tickers without usable price data are skipped
    /// with a warning; the table is possibly empty but always returned.
    pub fn run(
        &self,
        calls: &[ScoredCall],
        prices: &HashMap<String, Vec<DailyClose>>,
    ) -> ReturnTable {
        let series = overall_series(calls);
        let mut tickers: Vec<&String> = series.keys().collect();
        tickers.sort();

        let results: Vec<TickerBacktest> = tickers
            .par_iter()
            .filter_map(|ticker| match prices.get(ticker.as_str()) {
                Some(closes) if !closes.is_empty() => {
                    self.run_ticker(ticker.as_str(), &series[ticker.as_str()], closes)
                }
                _ => {
                    tracing::warn!("No price data for {}, skipping ticker", ticker);
                    None
                }
            })
            .collect();

        merge_results(&results)
    }
}

fn zip_curve(closes: &[DailyClose], values: &[f64]) -> Vec<CurvePoint> {
    closes
        .iter()
        .zip(values)
        .map(|(c, &value)| CurvePoint { date: c.date, value })
        .collect()
}

/// Union the per-ticker curves into one table; cells are empty where a
/// ticker's calendar has no session on a date.
fn merge_results(results: &[TickerBacktest]) -> ReturnTable {
    let mut date_index: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
    for result in results {
        for point in &result.sentiment_curve {
            date_index.entry(point.date).or_default();
        }
        for point in &result.buy_hold_curve {
            date_index.entry(point.date).or_default();
        }
    }
    for (i, slot) in date_index.values_mut().enumerate() {
        *slot = i;
    }
    let dates: Vec<chrono::NaiveDate> = date_index.keys().copied().collect();

    let mut columns = Vec::with_capacity(results.len() * 2);
    for result in results {
        for (suffix, curve) in [
            ("sentiment", &result.sentiment_curve),
            ("buyhold", &result.buy_hold_curve),
        ] {
            let mut values = vec![None; dates.len()];
            for point in curve {
                values[date_index[&point.date]] = Some(point.value);
            }
            columns.push(ReturnColumn {
                name: format!("{}_{}", result.ticker, suffix),
                values,
            });
        }
    }

    ReturnTable { dates, columns }
}
