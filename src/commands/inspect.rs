//! Inspect command implementation
//!
//! Prints one JSON object per open marker with its decoded label.

use anyhow::Result;
use marker_scripts::export::read_markers_csv;
use marker_scripts::label::LabelRecord;
use marker_scripts::MarkerKind;
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(path: PathBuf) -> Result<()> {
    let markers = read_markers_csv(&path)?;
    info!("Read {} markers from {}", markers.len(), path.display());

    let mut decoded = 0;
    let mut failed = 0;
    for marker in markers.iter().filter(|m| m.kind == MarkerKind::BuyToOpen) {
        match LabelRecord::parse(&marker.name) {
            Ok(label) => {
                let line = serde_json::json!({
                    "datetime": marker.datetime,
                    "price": marker.price,
                    "label": label,
                });
                println!("{}", serde_json::to_string(&line)?);
                decoded += 1;
            }
            Err(e) => {
                warn!("{} at {}: {}", marker.symbol, marker.datetime, e);
                failed += 1;
            }
        }
    }

    info!("Decoded {} labels ({} failed)", decoded, failed);
    Ok(())
}
