//! CSV file price adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with a header row. The date
//! column is `date` (any case); the close column is `close`, falling back to
//! `adj close` when no plain close column exists.

use crate::domain::error::SimError;
use crate::domain::price::PriceSeries;
use crate::ports::price_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

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
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// `None` for blank, `null` or `nan` cells.
fn parse_close(raw: &str) -> Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| format!("invalid close value '{}': {}", raw, e))
}

impl PriceSource for CsvAdapter {
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| SimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| SimError::Data {
                reason: format!("{}: CSV header error: {}", path.display(), e),
            })?
            .clone();

        let date_col = find_column(&headers, &["date"]).ok_or_else(|| SimError::Data {
            reason: format!("{}: missing date column", path.display()),
        })?;
        let close_col = find_column(&headers, &["close", "adj close"]).ok_or_else(|| SimError::Data {
            reason: format!("{}: missing close column", path.display()),
        })?;

        let mut observations = Vec::new();
        let mut skipped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SimError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let raw_date = record.get(date_col).unwrap_or("");
            let Some(date) = parse_date(raw_date) else {
                return Err(SimError::Data {
                    reason: format!(
                        "{}: invalid date '{}' on row {}, expected YYYY-MM-DD",
                        path.display(),
                        raw_date,
                        line + 1
                    ),
                });
            };

            if date < start_date || date > end_date {
                continue;
            }

            let close = parse_close(record.get(close_col).unwrap_or("")).map_err(|reason| {
                SimError::Data {
                    reason: format!("{}: {} on row {}", path.display(), reason, line + 1),
                }
            })?;
            if close.is_none() {
                skipped += 1;
            }
            observations.push((date, close));
        }

        let series = PriceSeries::from_observations(symbol, observations);
        if skipped > 0 {
            debug!("{}: skipped {} rows without a close", symbol, skipped);
        }
        Ok(series)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| SimError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
