pub mod calendar;
pub mod engine;
pub mod models;
pub mod returns;
pub mod simulator;

#[cfg(test)]
mod tests;

pub use calendar::TradingCalendar;
pub use engine::BacktestEngine;
pub use models::{CurvePoint, ReturnColumn, ReturnTable, StrategyConfig, TickerBacktest, TradeRecord};
