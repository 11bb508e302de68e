use call_core::DailyClose;
use chrono::NaiveDate;

/// A ticker's trading days, sorted ascending. Calendars are ticker-specific;
/// two tickers may trade on different days (halts, listings).
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    days: Vec<NaiveDate>,
}

impl TradingCalendar {
    pub fn from_closes(closes: &[DailyClose]) -> Self {
        let mut days: Vec<NaiveDate> = closes.iter().map(|c| c.date).collect();
        days.sort();
        days.dedup();
        Self { days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn day(&self, index: usize) -> NaiveDate {
        self.days[index]
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.days.binary_search(&date).ok()
    }

    /// Map a calendar call date to the trading-day index where a trade may
    /// enter.
    ///
    /// A call on a trading day enters on the NEXT session (the information
    /// is not tradable intraday); a call on a non-trading day enters on the
    /// first session at or after it. Dates at or past the end of the
    /// calendar clamp to the last session. Empty calendars resolve nothing.
    pub fn entry_index(&self, call_date: NaiveDate) -> Option<usize> {
        if self.days.is_empty() {
            return None;
        }
        let last = self.days.len() - 1;
        match self.days.binary_search(&call_date) {
            Ok(i) => Some((i + 1).min(last)),
            Err(i) => Some(i.min(last)),
        }
    }
}
