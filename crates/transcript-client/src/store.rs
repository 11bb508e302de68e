use call_core::{EarningsCall, PipelineError, PipelineResult, YearQuarter};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

/// Key-based transcript store: one row per (ticker, year_quarter), upserted.
///
/// Safe for re-entrant use by a single process; concurrent multi-process
/// writers are not supported.
pub struct TranscriptStore {
    pool: SqlitePool,
}

impl TranscriptStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> PipelineResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transcripts (
                ticker TEXT NOT NULL,
                year_quarter TEXT NOT NULL,
                call_date TEXT NOT NULL,
                raw_text TEXT NOT NULL,
                PRIMARY KEY (ticker, year_quarter)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;
        Ok(())
    }

    /// Insert or replace the transcript for (ticker, year_quarter).
    pub async fn upsert(&self, call: &EarningsCall) -> PipelineResult<()> {
        sqlx::query(
            "INSERT INTO transcripts (ticker, year_quarter, call_date, raw_text)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (ticker, year_quarter)
             DO UPDATE SET call_date = excluded.call_date, raw_text = excluded.raw_text",
        )
        .bind(&call.ticker)
        .bind(call.year_quarter.to_string())
        .bind(call.date.format("%Y-%m-%d").to_string())
        .bind(&call.raw_text)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;
        Ok(())
    }

    /// Quarters already stored for a ticker.
    pub async fn cached_quarters(&self, ticker: &str) -> PipelineResult<Vec<YearQuarter>> {
        let rows = sqlx::query("SELECT year_quarter FROM transcripts WHERE ticker = ?")
            .bind(ticker)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::StoreError(e.to_string()))?;

        let mut quarters = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row
                .try_get("year_quarter")
                .map_err(|e| PipelineError::StoreError(e.to_string()))?;
            quarters.push(raw.parse()?);
        }
        Ok(quarters)
    }

    /// All stored calls for a ticker whose call date falls in [start, end],
    /// ordered by call date.
    pub async fn calls_in_range(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PipelineResult<Vec<EarningsCall>> {
        let rows = sqlx::query(
            "SELECT ticker, year_quarter, call_date, raw_text
             FROM transcripts
             WHERE ticker = ? AND call_date >= ? AND call_date <= ?
             ORDER BY call_date ASC",
        )
        .bind(ticker)
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;

        let mut calls = Vec::with_capacity(rows.len());
        for row in rows {
            calls.push(row_to_call(&row)?);
        }
        Ok(calls)
    }
}

fn row_to_call(row: &sqlx::sqlite::SqliteRow) -> PipelineResult<EarningsCall> {
    let ticker: String = row
        .try_get("ticker")
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;
    let year_quarter: String = row
        .try_get("year_quarter")
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;
    let call_date: String = row
        .try_get("call_date")
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;
    let raw_text: String = row
        .try_get("raw_text")
        .map_err(|e| PipelineError::StoreError(e.to_string()))?;

    Ok(EarningsCall {
        ticker,
        year_quarter: year_quarter.parse()?,
        date: NaiveDate::parse_from_str(&call_date, "%Y-%m-%d")
            .map_err(|e| PipelineError::StoreError(e.to_string()))?,
        raw_text,
    })
}
