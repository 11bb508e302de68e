//! strategy-runner: end-to-end earnings-call sentiment backtest.
//!
//! Fetches transcripts for each ticker, scores them with the language-model
//! oracle (cached per quarter), backtests the sentiment signal against daily
//! closes, and writes the combined return curves to CSV.
//!
//! Usage:
//!   cargo run -p strategy-runner -- --tickers AAPL MSFT --start 2023-01-01 --end 2023-12-31
//!
//! Options:
//!   --db PATH      SQLite path for transcript/score caches (default: earnings_calls.db)
//!   --out PATH     Output CSV path (default: results.csv)
//!   --trailing     Enable the trailing stop exit rule
//!
//! Environment:
//!   OPENAI_API_KEY        scoring oracle key (required for unscored calls)
//!   POLYGON_API_KEY       price history key (required)
//!   TRANSCRIPT_BASE_URL   transcript provider override
//!   SCORING_BASE_URL      scoring endpoint override

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use backtest_engine::{BacktestEngine, StrategyConfig};
use call_core::{DailyClose, PriceHistorySource, ScoredCall, TranscriptScorer, TranscriptSource};
use chrono::{Duration, NaiveDate};
use price_client::PriceClient;
use scoring_client::{ScoringClient, ScoringConfig};
use sqlx::SqlitePool;
use transcript_client::{TranscriptClient, TranscriptService, TranscriptStore};

mod report;
mod scored_cache;

use scored_cache::ScoredCallCache;

/// Price history is padded around the call range, as entry/exit days can
/// fall shortly outside it.
const PRICE_PAD_DAYS: i64 = 10;

struct RunnerArgs {
    tickers: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    db_path: String,
    out_path: PathBuf,
    trailing: bool,
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  strategy-runner --tickers AAPL MSFT ... --start YYYY-MM-DD --end YYYY-MM-DD");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db PATH      SQLite cache path (default: earnings_calls.db)");
    eprintln!("  --out PATH     Output CSV path (default: results.csv)");
    eprintln!("  --trailing     Enable the trailing stop exit rule");
    std::process::exit(1);
}

/// Boundary validation: reject an empty ticker list or an inverted date
/// range before anything runs.
fn parse_args(args: &[String]) -> anyhow::Result<RunnerArgs> {
    let tickers: Vec<String> = match args.iter().position(|a| a == "--tickers") {
        Some(idx) => args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect(),
        None => usage(),
    };
    if tickers.is_empty() {
        bail!("at least one ticker is required");
    }

    let date_arg = |flag: &str| -> anyhow::Result<NaiveDate> {
        let idx = args
            .iter()
            .position(|a| a == flag)
            .with_context(|| format!("{flag} is required"))?;
        let raw = args.get(idx + 1).with_context(|| format!("{flag} needs a value"))?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("bad date for {flag}: {raw}"))
    };
    let start = date_arg("--start")?;
    let end = date_arg("--end")?;
    if start >= end {
        bail!("start date {start} must be before end date {end}");
    }

    let string_arg = |flag: &str, default: &str| -> String {
        args.iter()
            .position(|a| a == flag)
            .and_then(|idx| args.get(idx + 1))
            .map(|s| s.to_string())
            .unwrap_or_else(|| default.to_string())
    };

    Ok(RunnerArgs {
        tickers,
        start,
        end,
        db_path: string_arg("--db", "earnings_calls.db"),
        out_path: PathBuf::from(string_arg("--out", "results.csv")),
        trailing: args.iter().any(|a| a == "--trailing"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strategy_runner=info,transcript_client=info,price_client=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let args = match parse_args(&args[1..]) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {e}");
            usage();
        }
    };

    tracing::info!(
        "strategy-runner: {} tickers, {} to {}, db={}",
        args.tickers.len(),
        args.start,
        args.end,
        args.db_path
    );

    let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", args.db_path)).await?;

    let transcript_store = TranscriptStore::new(pool.clone());
    transcript_store.init_tables().await?;
    let transcripts = TranscriptService::new(TranscriptClient::from_env(), transcript_store);

    let scored_cache = ScoredCallCache::new(pool.clone());
    scored_cache.init_tables().await?;

    let scorer = ScoringClient::new(ScoringConfig::from_env()?);

    let price_api_key =
        std::env::var("POLYGON_API_KEY").context("POLYGON_API_KEY must be set")?;
    let prices_source = PriceClient::new(price_api_key);

    // Step 1 + 2: transcripts and sentiment scores, per ticker, fail soft.
    let mut scored_calls: Vec<ScoredCall> = Vec::new();
    for ticker in &args.tickers {
        let calls = match transcripts.fetch_transcripts(ticker, args.start, args.end).await {
            Ok(calls) => calls,
            Err(e) => {
                tracing::warn!("Skipping {}: transcript fetch failed: {}", ticker, e);
                continue;
            }
        };
        tracing::info!("{}: {} transcripts in range", ticker, calls.len());

        for call in calls {
            if let Some(cached) = scored_cache.get(ticker, call.year_quarter).await? {
                scored_calls.push(cached);
                continue;
            }

            let scores = match scorer.score_transcript(&call.raw_text).await {
                Some(scores) => scores,
                None => {
                    tracing::warn!(
                        "{} {}: scoring exhausted retries, treating scores as absent",
                        ticker,
                        call.year_quarter
                    );
                    Default::default()
                }
            };
            let scored = ScoredCall {
                ticker: call.ticker,
                year_quarter: call.year_quarter,
                date: call.date,
                scores,
            };
            scored_cache.upsert(&scored).await?;
            scored_calls.push(scored);
        }
    }
    tracing::info!("Scored sentiment table: {} rows", scored_calls.len());

    // Step 3: price histories, padded around the call range.
    let price_start = args.start - Duration::days(PRICE_PAD_DAYS);
    let price_end = args.end + Duration::days(PRICE_PAD_DAYS);
    let mut prices: HashMap<String, Vec<DailyClose>> = HashMap::new();
    for ticker in &args.tickers {
        match prices_source.fetch_daily_closes(ticker, price_start, price_end).await {
            Ok(closes) if !closes.is_empty() => {
                prices.insert(ticker.clone(), closes);
            }
            Ok(_) => tracing::warn!("{}: no price data in range", ticker),
            Err(e) => tracing::warn!("{}: price fetch failed: {}", ticker, e),
        }
    }

    // Step 4: backtest.
    let config = StrategyConfig {
        use_trailing: args.trailing,
        ..Default::default()
    };
    let engine = BacktestEngine::new(config);
    let table = engine.run(&scored_calls, &prices);

    if table.is_empty() {
        tracing::warn!("No ticker produced results; nothing to write");
        return Ok(());
    }

    for column in &table.columns {
        if let Some(final_multiple) = table.final_value(&column.name) {
            tracing::info!("{}: final multiple {:.4}", column.name, final_multiple);
        }
    }

    report::write_csv(&table, &args.out_path)?;
    tracing::info!("Wrote {} rows to {}", table.dates.len(), args.out_path.display());
    Ok(())
}
