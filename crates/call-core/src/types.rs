use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{PipelineError, PipelineResult};

/// The seven per-call sentiment dimensions scored by the language model.
/// Each score lies in [-1, 1]; `None` means the model did not address the
/// category (treated as 0 downstream).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub forward_looking_sentiment: Option<f64>,
    pub management_confidence: Option<f64>,
    pub risk_and_uncertainty: Option<f64>,
    pub qa_sentiment: Option<f64>,
    pub opening_sentiment: Option<f64>,
    pub financial_performance_sentiment: Option<f64>,
    pub macroeconomic_reference_sentiment: Option<f64>,
}

impl SentimentScores {
    pub const CATEGORIES: [&'static str; 7] = [
        "forward_looking_sentiment",
        "management_confidence",
        "risk_and_uncertainty",
        "qa_sentiment",
        "opening_sentiment",
        "financial_performance_sentiment",
        "macroeconomic_reference_sentiment",
    ];

    /// Scores in the order of [`Self::CATEGORIES`].
    pub fn values(&self) -> [Option<f64>; 7] {
        [
            self.forward_looking_sentiment,
            self.management_confidence,
            self.risk_and_uncertainty,
            self.qa_sentiment,
            self.opening_sentiment,
            self.financial_performance_sentiment,
            self.macroeconomic_reference_sentiment,
        ]
    }
}

/// A fiscal quarter in the transcript provider's URL format,
/// e.g. `2023-year/1-quarter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearQuarter {
    pub year: i32,
    pub quarter: u8,
}

impl YearQuarter {
    pub fn new(year: i32, quarter: u8) -> PipelineResult<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(PipelineError::InvalidData(format!(
                "quarter out of range: {quarter}"
            )));
        }
        Ok(Self { year, quarter })
    }

    /// The quarter containing the given calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: ((date.month0() / 3) + 1) as u8,
        }
    }

    /// First calendar day of the quarter. Used as the nominal call date
    /// when the provider does not report one.
    pub fn first_day(&self) -> NaiveDate {
        let month = u32::from(self.quarter - 1) * 3 + 1;
        NaiveDate::from_ymd_opt(self.year, month, 1).expect("valid quarter start")
    }

    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self { year: self.year + 1, quarter: 1 }
        } else {
            Self { year: self.year, quarter: self.quarter + 1 }
        }
    }

    /// All quarters touching the inclusive date range, in order.
    pub fn spanning(start: NaiveDate, end: NaiveDate) -> Vec<Self> {
        let mut out = Vec::new();
        if start > end {
            return out;
        }
        let last = Self::from_date(end);
        let mut current = Self::from_date(start);
        while current <= last {
            out.push(current);
            current = current.next();
        }
        out
    }
}

impl fmt::Display for YearQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-year/{}-quarter", self.year, self.quarter)
    }
}

impl FromStr for YearQuarter {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year_part, quarter_part) = s
            .split_once("-year/")
            .ok_or_else(|| PipelineError::InvalidData(format!("bad year_quarter: {s}")))?;
        let year: i32 = year_part
            .parse()
            .map_err(|_| PipelineError::InvalidData(format!("bad year in: {s}")))?;
        let quarter: u8 = quarter_part
            .strip_suffix("-quarter")
            .and_then(|q| q.parse().ok())
            .ok_or_else(|| PipelineError::InvalidData(format!("bad quarter in: {s}")))?;
        YearQuarter::new(year, quarter)
    }
}

impl TryFrom<String> for YearQuarter {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<YearQuarter> for String {
    fn from(yq: YearQuarter) -> Self {
        yq.to_string()
    }
}

/// A fetched earnings-call transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsCall {
    pub ticker: String,
    pub year_quarter: YearQuarter,
    /// Nominal calendar day of the call.
    pub date: NaiveDate,
    pub raw_text: String,
}

/// One row of the sentiment table: a call with its scores, transcript
/// dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCall {
    pub ticker: String,
    pub year_quarter: YearQuarter,
    pub date: NaiveDate,
    pub scores: SentimentScores,
}

/// One daily close observation. A ticker's date-ordered closes double as
/// its trading calendar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}
