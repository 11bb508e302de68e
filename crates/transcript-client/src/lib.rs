use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use call_core::{
    EarningsCall, PipelineError, PipelineResult, TranscriptSource, YearQuarter,
};
use chrono::NaiveDate;
use reqwest::Client;

pub mod store;
pub use store::TranscriptStore;

const DEFAULT_BASE_URL: &str = "https://www.roic.ai";

/// Transcripts shorter than this are treated as scrape failures (cookie
/// walls, empty pages).
const MIN_TRANSCRIPT_CHARS: usize = 500;

/// HTTP client for the transcript provider's per-quarter pages.
#[derive(Clone)]
pub struct TranscriptClient {
    client: Client,
    base_url: String,
}

impl TranscriptClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TRANSCRIPT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Fetch one quarter's transcript. `Ok(None)` means the page exists but
    /// carries no usable transcript.
    pub async fn fetch_transcript(
        &self,
        ticker: &str,
        quarter: YearQuarter,
    ) -> PipelineResult<Option<String>> {
        let url = format!("{}/quote/{}/transcripts/{}", self.base_url, ticker, quarter);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::ApiError(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::ApiError(e.to_string()))?;
        Ok(extract_transcript(&body))
    }
}

/// Isolate the transcript section of a provider page: everything after the
/// "Earnings Call Transcript" heading up to the page footer.
fn extract_transcript(body: &str) -> Option<String> {
    let after_heading = match body.split_once("Earnings Call Transcript") {
        Some((_, rest)) => rest,
        None => body,
    };
    let transcript = match after_heading.split_once("Footer") {
        Some((text, _)) => text,
        None => after_heading,
    };
    let transcript = transcript.trim();

    if transcript.chars().count() < MIN_TRANSCRIPT_CHARS {
        return None;
    }
    Some(transcript.to_string())
}

/// Incremental transcript acquisition: store-first, fetch only missing
/// quarters, fail soft per quarter.
pub struct TranscriptService {
    client: TranscriptClient,
    store: TranscriptStore,
}

impl TranscriptService {
    pub fn new(client: TranscriptClient, store: TranscriptStore) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl TranscriptSource for TranscriptService {
    async fn fetch_transcripts(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PipelineResult<Vec<EarningsCall>> {
        let wanted = YearQuarter::spanning(start, end);
        let cached: HashSet<YearQuarter> =
            self.store.cached_quarters(ticker).await?.into_iter().collect();
        let missing: Vec<YearQuarter> = wanted
            .iter()
            .copied()
            .filter(|yq| !cached.contains(yq))
            .collect();

        if missing.is_empty() {
            tracing::info!("All requested quarters for {} already cached", ticker);
        } else {
            tracing::info!(
                "Fetching {} missing transcripts for {}",
                missing.len(),
                ticker
            );
        }

        for quarter in missing {
            match self.client.fetch_transcript(ticker, quarter).await {
                Ok(Some(raw_text)) => {
                    let call = EarningsCall {
                        ticker: ticker.to_string(),
                        year_quarter: quarter,
                        date: quarter.first_day(),
                        raw_text,
                    };
                    self.store.upsert(&call).await?;
                }
                Ok(None) => {
                    tracing::warn!("No usable transcript for {} {}", ticker, quarter);
                }
                Err(e) => {
                    // One bad quarter must not sink the ticker.
                    tracing::warn!("Skipping {} {}: {}", ticker, quarter, e);
                }
            }
        }

        self.store.calls_in_range(ticker, start, end).await
    }
}
