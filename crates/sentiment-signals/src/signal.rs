use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::aggregate::SentimentPoint;

/// Guard against division by zero when the expanding std collapses.
const EPSILON: f64 = 1e-12;

/// z-score thresholds for the discrete trade signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalConfig {
    pub upper: f64,
    pub lower: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { upper: 0.75, lower: -0.75 }
    }
}

/// Signal at one earnings call. `z` is NaN while the expanding statistics
/// are undefined (fewer than two prior calls).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub z: f64,
    /// -1, 0 or +1.
    pub signal: i8,
}

/// Convert a date-ascending overall-sentiment series into signals.
///
/// The z-score at call i uses only calls strictly before i: expanding mean
/// (defined from the second call) and sample standard deviation (defined
/// from the third). While either is undefined the z-score is NaN and the
/// signal 0, so the first two calls of a ticker never trade.
pub fn generate_signals(series: &[SentimentPoint], config: &SignalConfig) -> Vec<SignalPoint> {
    let overalls: Vec<f64> = series.iter().map(|p| p.overall).collect();

    series
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let prior = &overalls[..i];
            // statrs yields NaN for mean of no values and std_dev of fewer
            // than two, matching the undefined cases.
            let mu = prior.mean();
            let sig = prior.std_dev();
            let z = (point.overall - mu) / (sig + EPSILON);

            let signal = if z >= config.upper {
                1
            } else if z <= config.lower {
                -1
            } else {
                // NaN comparisons are false, so undefined z lands here.
                0
            };

            SignalPoint { date: point.date, z, signal }
        })
        .collect()
}
