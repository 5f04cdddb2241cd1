//! CSV market data adapter: one `<INSTRUMENT>.csv` per instrument.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::QuantsimError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::MarketDataSource;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Header: `date,open,high,low,close,volume`, dates as `YYYY-MM-DD`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

pub struct CsvDataSource {
    base_path: PathBuf,
}

impl CsvDataSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }
}

impl MarketDataSource for CsvDataSource {
    /// Rows are taken in file order; [`BarSeries::new`] rejects unsorted files.
    fn fetch_series(&self, instrument: &str) -> Result<BarSeries, QuantsimError> {
        let path = self.csv_path(instrument);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| QuantsimError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| QuantsimError::DataSource {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").map_err(|e| {
                QuantsimError::DataSource {
                    reason: format!(
                        "{} row {}: invalid date '{}': {}",
                        path.display(),
                        line + 1,
                        row.date,
                        e
                    ),
                }
            })?;
            bars.push(Bar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        BarSeries::new(instrument, bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_data() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("SPY.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000\n\
             2024-01-17,110.0,120.0,105.0,115.0,55000\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("UNSORTED.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-16,1,1,1,1,10\n\
             2024-01-15,1,1,1,1,10\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("BADDATE.csv"),
            "date,open,high,low,close,volume\n15/01/2024,1,1,1,1,10\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("EMPTY.csv"),
            "date,open,high,low,close,volume\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn fetch_series_returns_rows_in_order() {
        let dir = setup_test_data();
        let source = CsvDataSource::new(dir.path());
        let series = source.fetch_series("SPY").unwrap();

        assert_eq!(series.instrument(), "SPY");
        assert_eq!(series.len(), 3);
        let first = series.get(0).unwrap();
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(first.open, 100.0);
        assert_eq!(first.high, 110.0);
        assert_eq!(first.low, 90.0);
        assert_eq!(first.close, 105.0);
        assert_eq!(first.volume, 50000);
        assert_eq!(series.close(2), Some(115.0));
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let dir = setup_test_data();
        let source = CsvDataSource::new(dir.path());
        assert!(matches!(
            source.fetch_series("XYZ"),
            Err(QuantsimError::DataSource { .. })
        ));
    }

    #[test]
    fn unsorted_file_is_invalid_data() {
        let dir = setup_test_data();
        let source = CsvDataSource::new(dir.path());
        match source.fetch_series("UNSORTED") {
            Err(QuantsimError::InvalidData { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn bad_date_is_data_source_error() {
        let dir = setup_test_data();
        let source = CsvDataSource::new(dir.path());
        assert!(matches!(
            source.fetch_series("BADDATE"),
            Err(QuantsimError::DataSource { .. })
        ));
    }

    #[test]
    fn empty_file_is_invalid_data() {
        let dir = setup_test_data();
        let source = CsvDataSource::new(dir.path());
        assert!(matches!(
            source.fetch_series("EMPTY"),
            Err(QuantsimError::InvalidData { .. })
        ));
    }
}
