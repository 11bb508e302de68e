use call_core::{PipelineError, PipelineResult, ScoredCall, SentimentScores, YearQuarter};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

/// Incremental cache of scored calls keyed by (ticker, year_quarter), so
/// re-runs skip the language-model round trip for calls already scored.
/// Transcript text is never stored here.
pub struct ScoredCallCache {
    pool: SqlitePool,
}

impl ScoredCallCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> PipelineResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS scored_calls (
                ticker TEXT NOT NULL,
                year_quarter TEXT NOT NULL,
                call_date TEXT NOT NULL,
                forward_looking_sentiment REAL,
                management_confidence REAL,
                risk_and_uncertainty REAL,
                qa_sentiment REAL,
                opening_sentiment REAL,
                financial_performance_sentiment REAL,
                macroeconomic_reference_sentiment REAL,
                PRIMARY KEY (ticker, year_quarter)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;
        Ok(())
    }

    pub async fn upsert(&self, call: &ScoredCall) -> PipelineResult<()> {
        sqlx::query(
            "INSERT INTO scored_calls (
                ticker, year_quarter, call_date,
                forward_looking_sentiment, management_confidence,
                risk_and_uncertainty, qa_sentiment, opening_sentiment,
                financial_performance_sentiment, macroeconomic_reference_sentiment
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (ticker, year_quarter) DO UPDATE SET
                call_date = excluded.call_date,
                forward_looking_sentiment = excluded.forward_looking_sentiment,
                management_confidence = excluded.management_confidence,
                risk_and_uncertainty = excluded.risk_and_uncertainty,
                qa_sentiment = excluded.qa_sentiment,
                opening_sentiment = excluded.opening_sentiment,
                financial_performance_sentiment = excluded.financial_performance_sentiment,
                macroeconomic_reference_sentiment = excluded.macroeconomic_reference_sentiment",
        )
        .bind(&call.ticker)
        .bind(call.year_quarter.to_string())
        .bind(call.date.format("%Y-%m-%d").to_string())
        .bind(call.scores.forward_looking_sentiment)
        .bind(call.scores.management_confidence)
        .bind(call.scores.risk_and_uncertainty)
        .bind(call.scores.qa_sentiment)
        .bind(call.scores.opening_sentiment)
        .bind(call.scores.financial_performance_sentiment)
        .bind(call.scores.macroeconomic_reference_sentiment)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;
        Ok(())
    }

    pub async fn get(
        &self,
        ticker: &str,
        quarter: YearQuarter,
    ) -> PipelineResult<Option<ScoredCall>> {
        let row = sqlx::query(
            "SELECT ticker, year_quarter, call_date,
                forward_looking_sentiment, management_confidence,
                risk_and_uncertainty, qa_sentiment, opening_sentiment,
                financial_performance_sentiment, macroeconomic_reference_sentiment
             FROM scored_calls WHERE ticker = ? AND year_quarter = ?",
        )
        .bind(ticker)
        .bind(quarter.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;

        row.map(|r| row_to_scored(&r)).transpose()
    }
}

fn row_to_scored(row: &sqlx::sqlite::SqliteRow) -> PipelineResult<ScoredCall> {
    let get_text = |key: &str| -> PipelineResult<String> {
        row.try_get(key)
            .map_err(|e| PipelineError::StoreError(e.to_string()))
    };
    let get_score = |key: &str| -> PipelineResult<Option<f64>> {
        row.try_get(key)
            .map_err(|e| PipelineError::StoreError(e.to_string()))
    };

    let year_quarter: YearQuarter = get_text("year_quarter")?.parse()?;
    let date = NaiveDate::parse_from_str(&get_text("call_date")?, "%Y-%m-%d")
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;

    Ok(ScoredCall {
        ticker: get_text("ticker")?,
        year_quarter,
        date,
        scores: SentimentScores {
            forward_looking_sentiment: get_score("forward_looking_sentiment")?,
            management_confidence: get_score("management_confidence")?,
            risk_and_uncertainty: get_score("risk_and_uncertainty")?,
            qa_sentiment: get_score("qa_sentiment")?,
            opening_sentiment: get_score("opening_sentiment")?,
            financial_performance_sentiment: get_score("financial_performance_sentiment")?,
            macroeconomic_reference_sentiment: get_score("macroeconomic_reference_sentiment")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_scored_calls_with_absent_fields() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let cache = ScoredCallCache::new(pool);
        cache.init_tables().await.unwrap();

        let quarter: YearQuarter = "2023-year/2-quarter".parse().unwrap();
        let call = ScoredCall {
            ticker: "AAPL".to_string(),
            year_quarter: quarter,
            date: quarter.first_day(),
            scores: SentimentScores {
                forward_looking_sentiment: Some(0.4),
                qa_sentiment: Some(-0.1),
                ..Default::default()
            },
        };
        cache.upsert(&call).await.unwrap();

        let got = cache.get("AAPL", quarter).await.unwrap().unwrap();
        assert_eq!(got.scores.forward_looking_sentiment, Some(0.4));
        assert_eq!(got.scores.management_confidence, None);
        assert_eq!(got.date, call.date);

        assert!(cache.get("MSFT", quarter).await.unwrap().is_none());
    }
}
