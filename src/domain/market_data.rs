//! Per-symbol bar bundle and the unified simulation timeline.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::domain::ohlcv::Bar;

/// One symbol's ordered history (oldest first) plus metadata consumed by
/// sizing and limit checks.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub point_value: f64,
    pub correlation_group: Option<String>,
    date_index: HashMap<NaiveDate, usize>,
}

impl SymbolData {
    pub fn new(
        symbol: String,
        bars: Vec<Bar>,
        point_value: f64,
        correlation_group: Option<String>,
    ) -> Self {
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            symbol,
            bars,
            point_value,
            correlation_group,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn bar_on(&self, date: NaiveDate) -> Option<&Bar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Bars strictly before `date` (the lookback window for channels).
    pub fn bars_before(&self, date: NaiveDate) -> &[Bar] {
        match self.index_of(date) {
            Some(i) => &self.bars[..i],
            None => {
                // Gap day for this symbol: take everything dated earlier.
                let end = self.bars.partition_point(|b| b.date < date);
                &self.bars[..end]
            }
        }
    }

    /// Bars up to and including `date`.
    pub fn bars_through(&self, date: NaiveDate) -> &[Bar] {
        let end = self.bars.partition_point(|b| b.date <= date);
        &self.bars[..end]
    }
}

/// Merge every symbol's dates into one ascending timeline.
pub fn build_unified_timeline(symbols: &[SymbolData]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = symbols
        .iter()
        .flat_map(|sd| sd.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
