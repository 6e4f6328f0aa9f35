//! Market data access port trait.

use chrono::NaiveDate;

use crate::domain::error::TortugaError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// Daily bars for one symbol in ascending date order. The range is
    /// inclusive on both ends.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TortugaError>;

    fn list_symbols(&self) -> Result<Vec<String>, TortugaError>;

    /// First date, last date, and bar count for a symbol, or `None` when
    /// the symbol is unknown.
    fn data_range(&self, symbol: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TortugaError>;
}
