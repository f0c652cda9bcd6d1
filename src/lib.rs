//! Marker Scripts
//!
//! Per-bar marker scripts for charting hosts that can only export data through
//! trade markers. Each firing bar gets a buy-to-open/sell-to-close pair whose
//! open marker name carries a pipe-delimited label (session OHLC, earnings).

pub mod aggregation;
pub mod config;
pub mod data;
pub mod earnings;
pub mod engine;
pub mod export;
pub mod history;
pub mod label;
pub mod markers;
pub mod scripts;
pub mod session;
pub mod types;

pub use config::Config;
pub use scripts::MarkerScript;
pub use types::*;
