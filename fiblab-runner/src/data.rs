//! Market data providers.
//!
//! The engine assumes a complete, validated, chronologically sorted series;
//! providers are responsible for delivering exactly that. Two built-ins:
//! CSV files (the interchange boundary with whatever fetched the data) and
//! a seeded synthetic walk for demos and tests. Prices parse straight from
//! decimal strings to scaled integers — no float round trip.

use crate::config::DataConfig;
use chrono::NaiveDate;
use fiblab_core::domain::Bar;
use fiblab_core::error::DataError;
use fiblab_core::fixed::{price_from_decimal, Price};
use fiblab_core::series::BarSeries;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("row {row}: bad {field} value `{value}`")]
    BadField {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error(transparent)]
    Integrity(#[from] DataError),
}

/// The data-acquisition boundary: hands the engine a gap-free, sorted,
/// validated series for the requested range. No retries, no pagination —
/// that belongs to whatever sits behind the implementation.
pub trait MarketDataProvider {
    fn get_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<BarSeries, DataLoadError>;
}

fn clip_range(bars: &mut Vec<Bar>, start: Option<NaiveDate>, end: Option<NaiveDate>) {
    bars.retain(|bar| {
        start.map_or(true, |s| bar.date >= s) && end.map_or(true, |e| bar.date <= e)
    });
}

/// CSV provider. Expected header: `date,open,high,low,close,volume`.
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MarketDataProvider for CsvProvider {
    fn get_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<BarSeries, DataLoadError> {
        let file = std::fs::File::open(&self.path).map_err(|source| DataLoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let mut bars = Vec::new();

        for (i, record) in reader.records().enumerate() {
            let row = i + 1;
            let record = record.map_err(|source| DataLoadError::Csv {
                path: self.path.clone(),
                source,
            })?;
            bars.push(parse_row(&record, row)?);
        }
        clip_range(&mut bars, start, end);

        let series = BarSeries::new(symbol, bars);
        series.validate()?;
        Ok(series)
    }
}

fn parse_row(record: &csv::StringRecord, row: usize) -> Result<Bar, DataLoadError> {
    fn get<'r>(
        record: &'r csv::StringRecord,
        row: usize,
        idx: usize,
        name: &'static str,
    ) -> Result<&'r str, DataLoadError> {
        record.get(idx).ok_or(DataLoadError::BadField {
            row,
            field: name,
            value: String::new(),
        })
    }
    fn price(
        record: &csv::StringRecord,
        row: usize,
        idx: usize,
        name: &'static str,
    ) -> Result<Price, DataLoadError> {
        let text = get(record, row, idx, name)?;
        price_from_decimal(text).ok_or_else(|| DataLoadError::BadField {
            row,
            field: name,
            value: text.to_string(),
        })
    }

    let date_text = get(record, row, 0, "date")?;
    let date = NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d").map_err(|_| {
        DataLoadError::BadField {
            row,
            field: "date",
            value: date_text.to_string(),
        }
    })?;
    let volume_text = get(record, row, 5, "volume")?;
    let volume: u64 = volume_text.trim().parse().map_err(|_| DataLoadError::BadField {
        row,
        field: "volume",
        value: volume_text.to_string(),
    })?;

    Ok(Bar {
        date,
        open: price(record, row, 1, "open")?,
        high: price(record, row, 2, "high")?,
        low: price(record, row, 3, "low")?,
        close: price(record, row, 4, "close")?,
        volume,
    })
}

/// Seeded synthetic provider: a gentle trend plus noise, occasionally
/// volume-spiked so breakout strategies have something to chew on.
pub struct SyntheticProvider {
    pub bars: usize,
    pub seed: u64,
}

impl SyntheticProvider {
    pub fn new(bars: usize, seed: u64) -> Self {
        Self { bars, seed }
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn get_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<BarSeries, DataLoadError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let base_date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let mut price: Price = 150_000_000;

        let mut bars: Vec<Bar> = (0..self.bars)
            .map(|i| {
                let drift = 40_000; // gentle upward trend
                let noise = rng.gen_range(-3_000_000..=3_000_000);
                price = (price + drift + noise).max(30_000_000);

                let spread = rng.gen_range(200_000..=2_500_000);
                let open = price - rng.gen_range(0..=spread);
                let close = price;
                let high = open.max(close) + rng.gen_range(100_000..=spread);
                let low = (open.min(close) - rng.gen_range(100_000..=spread)).max(10_000_000);
                // Roughly one bar in twelve prints breakout-grade volume.
                let volume = if rng.gen_ratio(1, 12) {
                    rng.gen_range(3000..8000)
                } else {
                    rng.gen_range(800..1400)
                };

                Bar {
                    date: base_date + chrono::Duration::days(i as i64),
                    open,
                    high,
                    low,
                    close,
                    volume,
                }
            })
            .collect();
        clip_range(&mut bars, start, end);

        let series = BarSeries::new(symbol, bars);
        series.validate()?;
        Ok(series)
    }
}

/// Build the provider a config asks for and load the series.
pub fn load_series(config: &DataConfig, symbol: &str) -> Result<BarSeries, DataLoadError> {
    match config {
        DataConfig::Csv { path } => CsvProvider::new(path.as_path()).get_bars(symbol, None, None),
        DataConfig::Synthetic { bars, seed } => {
            SyntheticProvider::new(*bars, *seed).get_bars(symbol, None, None)
        }
    }
}

/// Write a series back out as CSV (the inverse of `CsvProvider`).
pub fn write_csv(series: &BarSeries, path: &Path) -> Result<(), DataLoadError> {
    use fiblab_core::fixed::format_price;
    let mut writer = csv::Writer::from_path(path).map_err(|source| DataLoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let io_err = |source: csv::Error| DataLoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    writer
        .write_record(["date", "open", "high", "low", "close", "volume"])
        .map_err(io_err)?;
    for bar in &series.bars {
        writer
            .write_record([
                bar.date.format("%Y-%m-%d").to_string(),
                format_price(bar.open),
                format_price(bar.high),
                format_price(bar.low),
                format_price(bar.close),
                bar.volume.to_string(),
            ])
            .map_err(io_err)?;
    }
    writer.flush().map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_series_is_valid_and_deterministic() {
        let provider = SyntheticProvider::new(300, 42);
        let a = provider.get_bars("SYN", None, None).unwrap();
        let b = provider.get_bars("SYN", None, None).unwrap();
        assert_eq!(a.len(), 300);
        assert_eq!(a.bars, b.bars);
        a.validate().unwrap();
    }

    #[test]
    fn range_clipping_is_inclusive() {
        let provider = SyntheticProvider::new(100, 42);
        let full = provider.get_bars("SYN", None, None).unwrap();
        let start = full.bars[10].date;
        let end = full.bars[19].date;
        let clipped = provider.get_bars("SYN", Some(start), Some(end)).unwrap();
        assert_eq!(clipped.len(), 10);
        assert_eq!(clipped.bars[0].date, start);
        assert_eq!(clipped.bars[9].date, end);
    }

    #[test]
    fn different_seeds_differ() {
        let a = SyntheticProvider::new(100, 1).get_bars("SYN", None, None).unwrap();
        let b = SyntheticProvider::new(100, 2).get_bars("SYN", None, None).unwrap();
        assert_ne!(a.bars, b.bars);
    }

    #[test]
    fn csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        let original = SyntheticProvider::new(50, 7).get_bars("SYN", None, None).unwrap();
        write_csv(&original, &path).unwrap();

        let loaded = CsvProvider::new(&path).get_bars("SYN", None, None).unwrap();
        assert_eq!(original.bars, loaded.bars);
    }

    #[test]
    fn csv_parses_plain_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-02,100.5,101.25,99.75,100.125,1500\n\
             2024-01-03,100.125,102,100,101.5,1800\n",
        )
        .unwrap();

        let series = CsvProvider::new(&path).get_bars("TEST", None, None).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].open, 100_500_000);
        assert_eq!(series.bars[0].close, 100_125_000);
        assert_eq!(series.bars[1].high, 102_000_000);
    }

    #[test]
    fn csv_bad_price_is_reported_with_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n2024-01-02,abc,101,99,100,1500\n",
        )
        .unwrap();

        let err = CsvProvider::new(&path).get_bars("TEST", None, None).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::BadField {
                row: 1,
                field: "open",
                ..
            }
        ));
    }

    #[test]
    fn csv_unsorted_dates_fail_integrity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-03,100,101,99,100,1500\n\
             2024-01-02,100,101,99,100,1500\n",
        )
        .unwrap();

        let err = CsvProvider::new(&path).get_bars("TEST", None, None).unwrap_err();
        assert!(matches!(err, DataLoadError::Integrity(_)));
    }
}
