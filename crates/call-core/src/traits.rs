use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{DailyClose, EarningsCall, PipelineResult, SentimentScores};

/// Source of earnings-call transcripts for a ticker over a date range.
///
/// Implementations must be idempotent (already-cached quarters are not
/// re-fetched) and fail soft: individual quarter failures shrink the result
/// instead of erroring.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcripts(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PipelineResult<Vec<EarningsCall>>;
}

/// Oracle mapping transcript text to the seven named sentiment scores.
///
/// Returns `None` only when the oracle is exhausted (e.g. retries spent);
/// malformed output degrades to absent category scores, never an error.
#[async_trait]
pub trait TranscriptScorer: Send + Sync {
    async fn score_transcript(&self, raw_text: &str) -> Option<SentimentScores>;
}

/// Source of daily close-price history for one ticker.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PipelineResult<Vec<DailyClose>>;
}
