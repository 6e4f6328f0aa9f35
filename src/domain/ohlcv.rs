//! Daily OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |prev_close - low|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (prev_close - self.low).abs();
        hl.max(hc).max(lc)
    }

    /// True range for the first bar of a series, where no previous close
    /// is available.
    pub fn raw_range(&self) -> f64 {
        self.high - self.low
    }
}
