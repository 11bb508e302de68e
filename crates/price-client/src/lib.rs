use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use call_core::{DailyClose, PipelineError, PipelineResult, PriceHistorySource};
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Window is full; sleep until the oldest timestamp expires.
            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "request window full, holding {:.1}s for the next slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Daily close-price history client.
#[derive(Clone)]
pub struct PriceClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PriceClient {
    pub fn new(api_key: String) -> Self {
        // Free tier users should set PRICE_API_RATE_LIMIT=5.
        let rate_limit: usize = std::env::var("PRICE_API_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Rate-limited send; retries up to three times when the API answers 429.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> PipelineResult<reqwest::Response> {
        let request = builder
            .build()
            .map_err(|e| PipelineError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| PipelineError::ApiError("request body not cloneable".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| PipelineError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "price API throttled us (429); sleeping {}s, retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(PipelineError::ApiError(
            "price API still throttling after 3 retries".to_string(),
        ))
    }

    /// Get adjusted daily closes for a symbol over an inclusive date range.
    /// Non-trading days are simply absent from the result.
    pub async fn get_daily_closes(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PipelineResult<Vec<DailyClose>> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            BASE_URL,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ApiError(e.to_string()))?;

        let mut closes: Vec<DailyClose> = agg_response
            .results
            .into_iter()
            .filter_map(|r| {
                DateTime::from_timestamp_millis(r.t).map(|ts| DailyClose {
                    date: ts.date_naive(),
                    close: r.c,
                })
            })
            .collect();
        closes.sort_by_key(|c| c.date);
        closes.dedup_by_key(|c| c.date);
        Ok(closes)
    }
}

#[async_trait]
impl PriceHistorySource for PriceClient {
    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PipelineResult<Vec<DailyClose>> {
        self.get_daily_closes(ticker, start, end).await
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp (ms)
    c: f64, // close
}
