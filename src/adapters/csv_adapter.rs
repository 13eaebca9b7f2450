//! CSV file candle feed.
//!
//! One file per instrument and timeframe, `<data_dir>/<INSTRUMENT>_<tf>.csv`,
//! with a `timestamp,open,high,low,close,volume` header. Timestamps may be
//! RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), `YYYY-MM-DD`, or epoch milliseconds.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::domain::candle::Candle;
use crate::domain::error::SignalError;
use crate::domain::market::Timeframe;
use crate::ports::candle_port::CandleFeed;

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvCandleFeed {
    base_path: PathBuf,
}

impl CsvCandleFeed {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, instrument: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", instrument, timeframe.as_str()))
    }

    /// Instruments with a file for `timeframe`, sorted.
    pub fn available_instruments(&self, timeframe: Timeframe) -> Result<Vec<String>, SignalError> {
        let entries = std::fs::read_dir(&self.base_path)?;
        let suffix = format!("_{}.csv", timeframe.as_str());
        let mut instruments = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(instrument) = name.strip_suffix(&suffix) {
                instruments.push(instrument.to_string());
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ts| ts.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Parses a whole CSV body into candles sorted ascending by timestamp.
pub fn parse_candles(
    content: &str,
    source: &Path,
    instrument: &str,
) -> Result<Vec<Candle>, SignalError> {
    let feed_error = |reason: String| SignalError::CandleFeed {
        instrument: instrument.to_string(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut candles = Vec::new();

    for (line, row) in rdr.deserialize::<CandleRow>().enumerate() {
        let row = row.map_err(|e| feed_error(format!("{}: {}", source.display(), e)))?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| {
            feed_error(format!(
                "{}: row {}: invalid timestamp '{}'",
                source.display(),
                line + 1,
                row.timestamp
            ))
        })?;
        candles.push(Candle {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

#[async_trait]
impl CandleFeed for CsvCandleFeed {
    async fn get_candles(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, SignalError> {
        let path = self.csv_path(instrument, timeframe);
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| SignalError::CandleFeed {
                    instrument: instrument.to_string(),
                    reason: format!("failed to read {}: {}", path.display(), e),
                })?;

        let mut candles = parse_candles(&content, &path, instrument)?;
        if candles.len() > count {
            candles.drain(..candles.len() - count);
        }
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume\n\
            2024-01-15 02:00:00,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15 00:00:00,100.0,110.0,90.0,105.0,50000\n\
            2024-01-15T03:00:00Z,110.0,120.0,105.0,115.0,55000.5\n";

        fs::write(path.join("BTCUSD_1h.csv"), csv_content).unwrap();
        fs::write(path.join("ETHUSD_1h.csv"), "timestamp,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("ETHUSD_5m.csv"), "timestamp,open,high,low,close,volume\n").unwrap();

        (dir, path)
    }

    #[tokio::test]
    async fn get_candles_sorted_ascending() {
        let (_dir, path) = setup_test_data();
        let feed = CsvCandleFeed::new(path);

        let candles = feed.get_candles("BTCUSD", Timeframe::H1, 100).await.unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].close, 105.0);
        assert_eq!(candles[2].volume, 55000.5);
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn get_candles_keeps_most_recent() {
        let (_dir, path) = setup_test_data();
        let feed = CsvCandleFeed::new(path);

        let candles = feed.get_candles("BTCUSD", Timeframe::H1, 2).await.unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 115.0);
    }

    #[tokio::test]
    async fn missing_file_is_a_feed_error() {
        let (_dir, path) = setup_test_data();
        let feed = CsvCandleFeed::new(path);

        let err = feed.get_candles("XYZ", Timeframe::H1, 10).await.unwrap_err();
        assert!(matches!(err, SignalError::CandleFeed { .. }));
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let content = "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n";
        let err = parse_candles(content, Path::new("x.csv"), "BTCUSD").unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn parses_epoch_millis_and_dates() {
        assert_eq!(
            parse_timestamp("1704067200000"),
            DateTime::<Utc>::from_timestamp(1_704_067_200, 0)
        );
        assert_eq!(
            parse_timestamp("2024-01-01"),
            DateTime::<Utc>::from_timestamp(1_704_067_200, 0)
        );
    }

    #[test]
    fn available_instruments_by_timeframe() {
        let (_dir, path) = setup_test_data();
        let feed = CsvCandleFeed::new(path);

        assert_eq!(
            feed.available_instruments(Timeframe::H1).unwrap(),
            vec!["BTCUSD", "ETHUSD"]
        );
        assert_eq!(feed.available_instruments(Timeframe::M5).unwrap(), vec!["ETHUSD"]);
    }
}
