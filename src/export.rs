//! Marker export (CSV/JSON)
//!
//! The exported marker names are the data channel: downstream consumers read
//! the open markers' labels back out of these files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::SymbolRun;
use crate::Marker;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "both" => Ok(ExportFormat::Both),
            other => anyhow::bail!("Unknown export format '{}' (expected csv, json or both)", other),
        }
    }
}

/// Files written by one export
#[derive(Debug, Clone, Default)]
pub struct ExportPaths {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

pub fn write_markers_csv(path: &Path, markers: &[Marker]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create markers CSV {}", path.display()))?;
    for marker in markers {
        writer
            .serialize(marker)
            .with_context(|| format!("Failed to write marker to {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_markers_csv(path: &Path) -> Result<Vec<Marker>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open markers CSV {}", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Failed to read marker row {}", i + 1)))
        .collect()
}

pub fn write_markers_json(path: &Path, markers: &[Marker]) -> Result<()> {
    let json = serde_json::to_string_pretty(markers).context("Failed to serialize markers")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write markers JSON {}", path.display()))?;
    Ok(())
}

/// Write every run's markers, symbol by symbol, into `output_dir`.
pub fn export_run(
    output_dir: impl AsRef<Path>,
    runs: &[SymbolRun],
    format: ExportFormat,
) -> Result<ExportPaths> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir {}", output_dir.display()))?;

    let markers: Vec<Marker> = runs.iter().flat_map(|r| r.markers.iter().cloned()).collect();
    let mut paths = ExportPaths::default();

    if matches!(format, ExportFormat::Csv | ExportFormat::Both) {
        let path = output_dir.join("markers.csv");
        write_markers_csv(&path, &markers)?;
        paths.csv = Some(path);
    }
    if matches!(format, ExportFormat::Json | ExportFormat::Both) {
        let path = output_dir.join("markers.json");
        write_markers_json(&path, &markers)?;
        paths.json = Some(path);
    }

    info!("Exported {} markers to {}", markers.len(), output_dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, MarkerKind, Symbol};
    use chrono::{TimeZone, Utc};

    fn markers() -> Vec<Marker> {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        vec![
            Marker {
                symbol: Symbol::new("XYZ"),
                datetime: t,
                kind: MarkerKind::BuyToOpen,
                price: 99.0,
                quantity: 1,
                color: Color::Black,
                name: "SOHLCP|XYZ|100|105|99|104|104.5".to_string(),
            },
            Marker {
                symbol: Symbol::new("XYZ"),
                datetime: t,
                kind: MarkerKind::SellToClose,
                price: 105.0,
                quantity: 1,
                color: Color::Black,
                name: "SellClose".to_string(),
            },
        ]
    }

    #[test]
    fn test_csv_keeps_pipe_labels_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.csv");
        write_markers_csv(&path, &markers()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("symbol,datetime,kind,price,quantity,color,name"));
        assert!(contents.contains("buy_to_open"));

        assert_eq!(read_markers_csv(&path).unwrap(), markers());
    }

    #[test]
    fn test_export_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let run = SymbolRun {
            symbol: Symbol::new("XYZ"),
            bars_evaluated: 1,
            bars_fired: 1,
            bars_skipped: 0,
            markers: markers(),
        };
        let paths = export_run(dir.path().join("out"), &[run], ExportFormat::Both).unwrap();
        assert!(paths.csv.unwrap().exists());

        let json = std::fs::read_to_string(paths.json.unwrap()).unwrap();
        let parsed: Vec<Marker> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].kind, MarkerKind::SellToClose);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
