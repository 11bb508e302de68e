use std::time::Duration;

use async_trait::async_trait;
use call_core::{PipelineError, PipelineResult, SentimentScores, TranscriptScorer};
use serde::{Deserialize, Serialize};

pub mod error;
pub mod parse;
pub mod prompt;

pub use error::{ScoringError, ScoringResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-5-nano";
const MAX_OUTPUT_TOKENS: u32 = 500;

/// Backoff schedule in seconds; the last delay repeats if the schedule is
/// shorter than the attempt count.
const BACKOFF_DELAYS: [u64; 5] = [1, 2, 5, 10, 20];
const MAX_ATTEMPTS: usize = 5;

/// Configuration for the scoring oracle. Constructed explicitly and passed
/// in; the client holds no ambient global state.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl ScoringConfig {
    /// Read configuration from the environment. The API key is mandatory;
    /// everything else has defaults.
    pub fn from_env() -> PipelineResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PipelineError::InvalidConfig("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self {
            base_url: std::env::var("SCORING_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: std::env::var("SCORING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_output_tokens: MAX_OUTPUT_TOKENS,
            timeout: Duration::from_secs(120),
        })
    }
}

/// Client for the language-model scoring endpoint.
#[derive(Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    config: ScoringConfig,
}

impl ScoringClient {
    pub fn new(config: ScoringConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    /// One scoring request; returns the model's raw output text.
    async fn request_output(&self, input: &str) -> ScoringResult<String> {
        let request = ResponsesRequest {
            model: &self.config.model,
            input,
            max_output_tokens: self.config.max_output_tokens,
            reasoning: Reasoning { effort: "low" },
            text: TextOptions {
                format: TextFormat { kind: "json_object" },
                verbosity: "low",
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/responses", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScoringError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let reply = response.json::<ResponsesReply>().await?;
        let output_text = reply.output_text();
        if output_text.is_empty() {
            return Err(ScoringError::InvalidResponse(
                "empty output text".to_string(),
            ));
        }
        Ok(output_text)
    }

    /// Request with capped exponential backoff. `None` after the final
    /// attempt fails; callers treat that as absent scores.
    pub async fn request_with_backoff(&self, input: &str) -> Option<String> {
        for attempt in 0..MAX_ATTEMPTS {
            match self.request_output(input).await {
                Ok(text) => return Some(text.trim().to_string()),
                Err(e) => {
                    tracing::warn!("Scoring call failed (attempt {}): {}", attempt + 1, e);
                    if attempt == MAX_ATTEMPTS - 1 {
                        return None;
                    }
                    let delay = BACKOFF_DELAYS[attempt.min(BACKOFF_DELAYS.len() - 1)];
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
            }
        }
        None
    }
}

#[async_trait]
impl TranscriptScorer for ScoringClient {
    async fn score_transcript(&self, raw_text: &str) -> Option<SentimentScores> {
        let input = prompt::build_prompt(raw_text);
        let output = self.request_with_backoff(&input).await?;
        Some(parse::parse_scores(&output))
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    max_output_tokens: u32,
    reasoning: Reasoning<'a>,
    text: TextOptions<'a>,
}

#[derive(Debug, Serialize)]
struct Reasoning<'a> {
    effort: &'a str,
}

#[derive(Debug, Serialize)]
struct TextOptions<'a> {
    format: TextFormat<'a>,
    verbosity: &'a str,
}

#[derive(Debug, Serialize)]
struct TextFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

impl ResponsesReply {
    fn output_text(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(default)]
    text: String,
}
