use std::collections::HashMap;

use call_core::{ScoredCall, SentimentScores};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One call's overall sentiment on its calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: NaiveDate,
    pub overall: f64,
}

/// Overall sentiment: mean of the seven category scores, absent scores
/// counted as 0.
pub fn overall_sentiment(scores: &SentimentScores) -> f64 {
    let values = scores.values();
    let sum: f64 = values.iter().map(|v| v.unwrap_or(0.0)).sum();
    sum / values.len() as f64
}

/// Group scored calls into per-ticker overall-sentiment series, ascending by
/// date. Sort order is stable so repeated runs produce identical expanding
/// statistics.
pub fn overall_series(calls: &[ScoredCall]) -> HashMap<String, Vec<SentimentPoint>> {
    let mut by_ticker: HashMap<String, Vec<SentimentPoint>> = HashMap::new();
    for call in calls {
        by_ticker
            .entry(call.ticker.clone())
            .or_default()
            .push(SentimentPoint {
                date: call.date,
                overall: overall_sentiment(&call.scores),
            });
    }
    for series in by_ticker.values_mut() {
        series.sort_by_key(|p| p.date);
    }
    by_ticker
}
