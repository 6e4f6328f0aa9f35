//! CSV file data adapter.
//!
//! One file per symbol (`{SYMBOL}.csv`) with a
//! `date,open,high,low,close,volume` header row. Bars are returned in
//! ascending date order regardless of file order.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::TortugaError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_all_bars(&self, symbol: &str) -> Result<Vec<Bar>, TortugaError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TortugaError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TortugaError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| TortugaError::Data {
                reason: "missing date column".into(),
            })?;
            let date =
                NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| TortugaError::Data {
                    reason: format!("invalid date format: {}", e),
                })?;

            let open = parse_price(&record, 1, "open")?;
            let high = parse_price(&record, 2, "high")?;
            let low = parse_price(&record, 3, "low")?;
            let close = parse_price(&record, 4, "close")?;

            let volume: i64 = record
                .get(5)
                .ok_or_else(|| TortugaError::Data {
                    reason: "missing volume column".into(),
                })?
                .parse()
                .map_err(|e| TortugaError::Data {
                    reason: format!("invalid volume value: {}", e),
                })?;

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn parse_price(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, TortugaError> {
    record
        .get(index)
        .ok_or_else(|| TortugaError::Data {
            reason: format!("missing {} column", name),
        })?
        .parse()
        .map_err(|e| TortugaError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TortugaError> {
        let bars = self.read_all_bars(symbol)?;
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TortugaError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TortugaError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TortugaError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(stem) = name_str.strip_suffix(".csv") {
                symbols.push(stem.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TortugaError> {
        if !self.csv_path(symbol).exists() {
            return Ok(None);
        }
        let bars = self.read_all_bars(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("GC.csv"), csv_content).unwrap();
        fs::write(path.join("CL.csv"), "date,open,high,low,close,volume\n").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let bars = adapter.fetch_bars("GC", start, end).unwrap();

        assert_eq!(bars.len(), 3);
        // Rows arrive out of order in the file; output is ascending.
        assert_eq!(bars[0].date, start);
        assert_eq!(bars[0].symbol, "GC");
        assert!((bars[0].open - 100.0).abs() < f64::EPSILON);
        assert!((bars[0].high - 110.0).abs() < f64::EPSILON);
        assert!((bars[0].low - 90.0).abs() < f64::EPSILON);
        assert!((bars[0].close - 105.0).abs() < f64::EPSILON);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[2].date, end);
    }

    #[test]
    fn fetch_bars_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let bars = adapter.fetch_bars("GC", day, day).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, day);
    }

    #[test]
    fn fetch_bars_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(adapter.fetch_bars("XYZ", start, end).is_err());
    }

    #[test]
    fn list_symbols_from_filenames() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["CL", "GC"]);
    }

    #[test]
    fn data_range_reports_extent() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let range = adapter.data_range("GC").unwrap().unwrap();
        assert_eq!(range.0, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(range.1, NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
        assert_eq!(range.2, 3);

        assert!(adapter.data_range("CL").unwrap().is_none());
        assert!(adapter.data_range("XYZ").unwrap().is_none());
    }
}
