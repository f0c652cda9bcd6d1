//! Bar data loading
//!
//! Reads OHLC(V) bars from CSV files named `<SYMBOL>_<timeframe>.csv`.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::{Bar, Symbol};

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Parse a bar timestamp: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or `YYYY-MM-DD` (midnight UTC)
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Load bars from a CSV file (`datetime,open,high,low,close[,volume]`)
///
/// Rows that fail bar validation are skipped with a warning.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut bars = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = parse_datetime(dt_str)
            .with_context(|| format!("Failed to parse datetime: {}", dt_str))?;

        let field = |idx: usize, name: &str| -> Result<f64> {
            record
                .get(idx)
                .with_context(|| format!("Missing {} column on row {}", name, row_idx + 1))?
                .parse::<f64>()
                .with_context(|| format!("Failed to parse {} on row {}", name, row_idx + 1))
        };

        let open = field(1, "open")?;
        let high = field(2, "high")?;
        let low = field(3, "low")?;
        let close = field(4, "close")?;
        let volume = match record.get(5) {
            Some(v) if !v.is_empty() => v
                .parse::<f64>()
                .with_context(|| format!("Failed to parse volume on row {}", row_idx + 1))?,
            _ => 0.0,
        };

        match Bar::new(datetime, open, high, low, close, volume) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid bar at row {} in {:?}: {}",
                    row_idx + 2, // 1-indexed plus header row
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid bars out of {} in {:?}",
            invalid_count,
            invalid_count + bars.len(),
            path.file_name().unwrap_or_default()
        );
    }

    Ok(bars)
}

/// Filter bars by an inclusive date range
pub fn filter_bars_by_date(
    bars: Vec<Bar>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| {
            let after_start = start.is_none_or(|s| b.datetime >= s);
            let before_end = end.is_none_or(|e| b.datetime <= e);
            after_start && before_end
        })
        .collect()
}

/// Parse a CLI date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS) to DateTime<Utc>
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    parse_datetime(date_str).with_context(|| {
        format!(
            "Failed to parse date: {}. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS format",
            date_str
        )
    })
}

/// Load data for multiple symbols from CSV files
pub fn load_multi_symbol(
    data_dir: impl AsRef<Path>,
    symbols: &[Symbol],
    timeframe: &str,
) -> Result<HashMap<Symbol, Vec<Bar>>> {
    load_multi_symbol_with_range(data_dir, symbols, timeframe, None, None)
}

/// Load data for multiple symbols with optional date range filtering
pub fn load_multi_symbol_with_range(
    data_dir: impl AsRef<Path>,
    symbols: &[Symbol],
    timeframe: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<HashMap<Symbol, Vec<Bar>>> {
    let mut data = HashMap::new();

    for symbol in symbols {
        let filename = format!("{}_{}.csv", symbol.as_str(), timeframe);
        let path = data_dir.as_ref().join(&filename);

        if !path.exists() {
            warn!("Data file not found: {}", path.display());
            continue;
        }

        let bars = load_csv(&path).with_context(|| format!("Failed to load data for {}", symbol))?;
        let original_len = bars.len();
        let bars = filter_bars_by_date(bars, start, end);

        if start.is_some() || end.is_some() {
            info!(
                "Loaded {} bars for {} (filtered from {} total)",
                bars.len(),
                symbol,
                original_len
            );
        } else {
            info!("Loaded {} bars for {}", bars.len(), symbol);
        }

        if !bars.is_empty() {
            data.insert(symbol.clone(), bars);
        }
    }

    if data.is_empty() {
        anyhow::bail!("No data loaded for any symbol");
    }

    Ok(data)
}

// =============================================================================
// Data Validation
// =============================================================================

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a bar series for bad bars and ordering problems
///
/// Repeated or decreasing timestamps are warnings: the engine skips them.
pub fn validate_bars(bars: &[Bar]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if bars.is_empty() {
        errors.push("No bars provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, bar) in bars.iter().enumerate() {
        if let Err(e) = bar.validate() {
            errors.push(format!("Bar {}: {}", i, e));
        }
        if i > 0 && bar.datetime <= bars[i - 1].datetime {
            warnings.push(format!("Bar {}: not chronological", i));
        }
    }

    ValidationResult { errors, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-03-01T14:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2024-03-01T09:30:00-05:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-01 14:30:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime("03/01/2024"), None);
    }

    #[test]
    fn test_load_csv_skips_invalid_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datetime,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-03-01 14:30:00,100,105,99,104,1000").unwrap();
        writeln!(file, "2024-03-01 14:31:00,104,103,105,104,1000").unwrap();
        writeln!(file, "2024-03-01 14:32:00,104,104.8,103.9,104.5").unwrap();

        let bars = load_csv(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 104.5);
        assert_eq!(bars[1].volume, 0.0);
    }

    #[test]
    fn test_load_csv_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datetime,open,high,low,close").unwrap();
        writeln!(file, "2024-03-01 14:30:00,abc,105,99,104").unwrap();
        assert!(load_csv(file.path()).is_err());
    }

    #[test]
    fn test_filter_by_date() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..5)
            .map(|d| {
                Bar::new_unchecked(t0 + chrono::Duration::days(d), 1.0, 1.0, 1.0, 1.0, 0.0)
            })
            .collect();
        let filtered = filter_bars_by_date(
            bars,
            Some(t0 + chrono::Duration::days(1)),
            Some(t0 + chrono::Duration::days(3)),
        );
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_load_multi_symbol_requires_some_data() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_multi_symbol(dir.path(), &[Symbol::new("XYZ")], "1m").unwrap_err();
        assert!(err.to_string().contains("No data loaded"));

        std::fs::write(
            dir.path().join("XYZ_1m.csv"),
            "datetime,open,high,low,close\n2024-03-01 14:30:00,1,2,0.5,1.5\n",
        )
        .unwrap();
        let data =
            load_multi_symbol(dir.path(), &[Symbol::new("XYZ"), Symbol::new("ABC")], "1m").unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[&Symbol::new("XYZ")].len(), 1);
    }

    #[test]
    fn test_validate_bars_flags_order() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let bars = vec![
            Bar::new_unchecked(t0, 1.0, 2.0, 0.5, 1.5, 0.0),
            Bar::new_unchecked(t0, 1.0, 2.0, 0.5, 1.5, 0.0),
        ];
        let result = validate_bars(&bars);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert!(!validate_bars(&[]).is_valid());
    }
}
