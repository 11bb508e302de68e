use std::collections::HashMap;

use call_core::{DailyClose, ScoredCall, SentimentScores, YearQuarter};
use chrono::NaiveDate;
use sentiment_signals::{SentimentPoint, SignalPoint};

use crate::calendar::TradingCalendar;
use crate::engine::BacktestEngine;
use crate::models::StrategyConfig;
use crate::{returns, simulator};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Helper: consecutive daily closes starting at 2023-03-01.
fn closes(prices: &[f64]) -> Vec<DailyClose> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| DailyClose {
            date: d("2023-03-01") + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

/// Helper: a signal event on the given calendar date.
fn sig(date: &str, signal: i8) -> SignalPoint {
    SignalPoint { date: d(date), z: 0.0, signal }
}

/// Helper: a sentiment point with the given overall score.
fn point(date: &str, overall: f64) -> SentimentPoint {
    SentimentPoint { date: d(date), overall }
}

/// Helper: a scored call whose seven categories all equal `score`, so the
/// overall sentiment equals `score` too.
fn scored(ticker: &str, date: &str, score: f64) -> ScoredCall {
    let date = d(date);
    ScoredCall {
        ticker: ticker.to_string(),
        year_quarter: YearQuarter::from_date(date),
        date,
        scores: SentimentScores {
            forward_looking_sentiment: Some(score),
            management_confidence: Some(score),
            risk_and_uncertainty: Some(score),
            qa_sentiment: Some(score),
            opening_sentiment: Some(score),
            financial_performance_sentiment: Some(score),
            macroeconomic_reference_sentiment: Some(score),
        },
    }
}

fn run_sim(
    signals: &[SignalPoint],
    prices: &[f64],
    config: &StrategyConfig,
) -> simulator::SimulationOutcome {
    let closes = closes(prices);
    let calendar = TradingCalendar::from_closes(&closes);
    simulator::simulate("T", signals, &calendar, &closes, config)
}

#[test]
fn stop_loss_closes_the_trade_that_day() {
    // Entry at 100 (signal date before the calendar maps to day 0).
    let cfg = StrategyConfig::default();
    let out = run_sim(
        &[sig("2023-02-27", 1)],
        &[100.0, 95.0, 84.9, 100.0, 100.0],
        &cfg,
    );

    assert_eq!(out.trades.len(), 1);
    let trade = &out.trades[0];
    assert_eq!(trade.exit_date, d("2023-03-03")); // the -15.1% day
    assert!((trade.pnl - (-0.151)).abs() < 1e-9);
    assert_eq!(out.positions, vec![0.65, 0.65, 0.65, 0.0, 0.0]);
}

#[test]
fn take_profit_closes_the_trade_that_day() {
    let cfg = StrategyConfig::default();
    let out = run_sim(
        &[sig("2023-02-27", 1)],
        &[100.0, 120.0, 151.0, 150.0],
        &cfg,
    );

    let trade = &out.trades[0];
    assert_eq!(trade.exit_date, d("2023-03-03"));
    assert!((trade.pnl - 0.51).abs() < 1e-9);
    assert_eq!(out.positions[3], 0.0);
}

#[test]
fn trailing_stop_triggers_on_giveback_from_best() {
    let cfg = StrategyConfig {
        use_trailing: true,
        ..Default::default()
    };
    // Best favorable excursion +15%, then a drop to +4%: 11% give-back.
    let out = run_sim(
        &[sig("2023-02-27", 1)],
        &[100.0, 115.0, 104.0, 130.0],
        &cfg,
    );

    let trade = &out.trades[0];
    assert_eq!(trade.exit_date, d("2023-03-03"));
    assert!((trade.pnl - 0.04).abs() < 1e-9);
}

#[test]
fn trailing_stop_needs_positive_excursion_first() {
    let cfg = StrategyConfig {
        use_trailing: true,
        ..Default::default()
    };
    // Drifting down without ever being favorable: no trailing exit, no stop.
    let out = run_sim(
        &[sig("2023-02-27", 1)],
        &[100.0, 99.0, 97.0, 96.0],
        &cfg,
    );
    assert_eq!(out.trades[0].exit_date, d("2023-03-04"));
}

#[test]
fn short_side_stops_on_adverse_rally() {
    let cfg = StrategyConfig::default();
    let out = run_sim(&[sig("2023-02-27", -1)], &[100.0, 116.0, 90.0], &cfg);

    let trade = &out.trades[0];
    assert_eq!(trade.side, -1);
    assert_eq!(trade.exit_date, d("2023-03-02"));
    assert!((trade.pnl - (-0.16)).abs() < 1e-9);
    assert_eq!(out.positions, vec![-0.65, -0.65, 0.0]);
}

#[test]
fn unstopped_trade_holds_through_the_window() {
    let cfg = StrategyConfig::default();
    let out = run_sim(
        &[sig("2023-02-27", 1)],
        &[100.0, 101.0, 102.0, 101.5],
        &cfg,
    );

    assert_eq!(out.trades[0].exit_date, d("2023-03-04"));
    assert_eq!(out.positions, vec![0.65; 4]);
}

#[test]
fn position_covers_every_calendar_day() {
    let cfg = StrategyConfig::default();
    let out = run_sim(&[sig("2023-03-02", 1)], &[100.0; 7], &cfg);
    assert_eq!(out.positions.len(), 7);
    // Entry maps to the day after the signal's trading day.
    assert_eq!(out.positions[0], 0.0);
    assert_eq!(out.positions[1], 0.0);
    assert!(out.positions[2..].iter().all(|&p| p == 0.65));
}

#[test]
fn later_event_wins_the_boundary_day() {
    let cfg = StrategyConfig::default();
    // First long window planned to the second event's entry; opposite side
    // takes over that day.
    let out = run_sim(
        &[sig("2023-02-27", 1), sig("2023-03-02", -1)],
        &[100.0, 101.0, 100.0, 99.0],
        &cfg,
    );

    assert_eq!(out.trades.len(), 2);
    assert_eq!(out.positions, vec![0.65, 0.65, -0.65, -0.65]);
}

#[test]
fn signal_with_empty_calendar_is_dropped() {
    let cfg = StrategyConfig::default();
    let out = run_sim(&[sig("2023-02-27", 1)], &[], &cfg);
    assert!(out.trades.is_empty());
    assert!(out.positions.is_empty());
}

#[test]
fn call_at_calendar_end_yields_zero_length_trade() {
    let cfg = StrategyConfig::default();
    let out = run_sim(&[sig("2023-04-15", 1)], &[100.0, 101.0, 102.0], &cfg);

    let trade = &out.trades[0];
    assert_eq!(trade.entry_date, d("2023-03-03"));
    assert_eq!(trade.exit_date, d("2023-03-03"));
    assert_eq!(trade.pnl, 0.0);
}

#[test]
fn flat_positions_give_exactly_flat_curve() {
    let engine = BacktestEngine::new(StrategyConfig::default());
    // Two calls: neither can trade (insufficient history), so the curve
    // must be exactly 1.0 everywhere with no cost drift.
    let series = vec![point("2023-01-01", 0.0), point("2023-04-01", 0.9)];
    let result = engine
        .run_ticker("T", &series, &closes(&[100.0, 103.0, 98.0, 105.0]))
        .unwrap();

    assert!(result.trades.is_empty());
    assert!(result.sentiment_curve.iter().all(|p| p.value == 1.0));
}

#[test]
fn buy_hold_is_normalized_price_regardless_of_signals() {
    let engine = BacktestEngine::new(StrategyConfig::default());
    let series = vec![
        point("2022-01-01", 0.1),
        point("2022-04-01", 0.2),
        point("2022-07-01", 0.15),
        point("2023-02-27", 0.9), // trades
    ];
    let prices = [100.0, 120.0, 151.0, 150.0];
    let result = engine.run_ticker("T", &series, &closes(&prices)).unwrap();

    for (i, pt) in result.buy_hold_curve.iter().enumerate() {
        assert!((pt.value - prices[i] / prices[0]).abs() < 1e-12);
    }
}

#[test]
fn costs_hit_entry_and_exit_days() {
    let cfg = StrategyConfig::default();
    let daily = closes(&[100.0, 100.0, 100.0, 100.0]);
    let calendar = TradingCalendar::from_closes(&daily);
    let out = simulator::simulate("T", &[sig("2023-03-01", 1)], &calendar, &daily, &cfg);

    let costs = returns::cost_series(&calendar, &out.trades, cfg.per_side_cost());
    // Entry day 1, held to the last day.
    assert_eq!(costs[0], 0.0);
    assert!((costs[1] - (-0.0002)).abs() < 1e-12);
    assert_eq!(costs[2], 0.0);
    assert!((costs[3] - (-0.0002)).abs() < 1e-12);
}

#[test]
fn same_day_entry_exit_charges_both_sides() {
    let cfg = StrategyConfig::default();
    // A call past the calendar end clamps to a zero-length window, so the
    // entry day and exit day coincide and both sides are charged on it.
    let daily = closes(&[100.0, 101.0, 102.0]);
    let calendar = TradingCalendar::from_closes(&daily);
    let out = simulator::simulate("T", &[sig("2023-04-15", 1)], &calendar, &daily, &cfg);

    assert_eq!(out.trades[0].entry_date, out.trades[0].exit_date);
    let costs = returns::cost_series(&calendar, &out.trades, cfg.per_side_cost());
    assert!((costs[2] - (-0.0004)).abs() < 1e-12);
}

#[test]
fn equity_curve_compounds_net_returns() {
    let positions = [0.0, 0.65, 0.65];
    let rets = [0.0, 0.10, -0.05];
    let costs = [0.0, -0.0002, 0.0];
    let curve = returns::equity_curve(&positions, &rets, &costs);

    let day1 = 1.0 * (1.0 + 0.65 * 0.10 - 0.0002);
    let day2 = day1 * (1.0 + 0.65 * -0.05);
    assert!((curve[1] - day1).abs() < 1e-12);
    assert!((curve[2] - day2).abs() < 1e-12);
}

#[test]
fn daily_returns_start_at_zero() {
    let rets = returns::daily_returns(&closes(&[100.0, 110.0, 99.0]));
    assert_eq!(rets[0], 0.0);
    assert!((rets[1] - 0.10).abs() < 1e-12);
    assert!((rets[2] - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
}

#[test]
fn two_call_ticker_never_trades_end_to_end() {
    // Overall sentiment 0.0 then 0.9; only one prior call at
    // the second date, so the expanding std is undefined and no trade fires.
    let engine = BacktestEngine::new(StrategyConfig::default());
    let calls = vec![scored("T", "2023-01-01", 0.0), scored("T", "2023-03-01", 0.9)];
    let prices = HashMap::from([(
        "T".to_string(),
        closes(&[100.0, 150.0, 50.0, 100.0]),
    )]);

    let table = engine.run(&calls, &prices);
    let last = table.final_value("T_sentiment").unwrap();
    assert_eq!(last, 1.0);
}

#[test]
fn run_skips_tickers_without_prices() {
    let engine = BacktestEngine::new(StrategyConfig::default());
    let calls = vec![
        scored("A", "2023-01-01", 0.1),
        scored("B", "2023-01-01", 0.1),
    ];
    let prices = HashMap::from([("A".to_string(), closes(&[10.0, 11.0]))]);

    let table = engine.run(&calls, &prices);
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["A_sentiment", "A_buyhold"]);
}

#[test]
fn run_returns_empty_table_for_empty_input() {
    let engine = BacktestEngine::new(StrategyConfig::default());
    let table = engine.run(&[], &HashMap::new());
    assert!(table.is_empty());
    assert!(table.dates.is_empty());
}

#[test]
fn merged_table_unions_distinct_calendars() {
    let engine = BacktestEngine::new(StrategyConfig::default());
    let calls = vec![
        scored("A", "2023-01-01", 0.1),
        scored("B", "2023-01-01", 0.1),
    ];
    let mut b_closes = closes(&[50.0, 51.0]);
    for c in &mut b_closes {
        c.date += chrono::Duration::days(10);
    }
    let prices = HashMap::from([
        ("A".to_string(), closes(&[10.0, 11.0])),
        ("B".to_string(), b_closes),
    ]);

    let table = engine.run(&calls, &prices);
    assert_eq!(table.dates.len(), 4);
    let a_col = &table.columns[0];
    assert!(a_col.values[0].is_some());
    assert!(a_col.values[3].is_none());
    let b_col = table.columns.iter().find(|c| c.name == "B_buyhold").unwrap();
    assert!(b_col.values[0].is_none());
    assert!((b_col.values[3].unwrap() - 51.0 / 50.0).abs() < 1e-12);
}
