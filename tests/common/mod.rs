#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;

use tortuga::domain::backtest::BacktestConfig;
use tortuga::domain::error::TortugaError;
use tortuga::domain::market_data::SymbolData;
pub use tortuga::domain::ohlcv::Bar;
use tortuga::ports::data_port::DataPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Trading day `i` of the synthetic calendar (day 0 = 2024-01-01).
pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(i as i64)
}

pub fn bar_at(symbol: &str, i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date: day(i),
        open,
        high,
        low,
        close,
        volume: 1000,
    }
}

/// `count` quiet bars at `price`: open = close = price, high/low one
/// point either side. True range is exactly 2.0 per bar, so N settles
/// at 2.0 once seeded.
pub fn flat_bars(symbol: &str, count: usize, price: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| bar_at(symbol, i, price, price + 1.0, price - 1.0, price))
        .collect()
}

pub fn make_symbol_data(symbol: &str, bars: Vec<Bar>) -> SymbolData {
    SymbolData::new(symbol.to_string(), bars, 1.0, None)
}

pub fn grouped_symbol_data(symbol: &str, bars: Vec<Bar>, group: &str) -> SymbolData {
    SymbolData::new(symbol.to_string(), bars, 1.0, Some(group.to_string()))
}

/// Config spanning day 0 through `last_day`, no costs, defaults
/// otherwise.
pub fn base_config(last_day: usize) -> BacktestConfig {
    BacktestConfig {
        start_date: day(0),
        end_date: day(last_day),
        ..BacktestConfig::default()
    }
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TortugaError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TortugaError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TortugaError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TortugaError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TortugaError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}
