//! Run command implementation

use anyhow::{Context, Result};
use marker_scripts::earnings::EarningsCalendar;
use marker_scripts::engine::{totals, EngineSettings, MarkerEngine};
use marker_scripts::{data, export, scripts, Config, Symbol};
use tracing::{debug, info, warn};

pub struct RunArgs {
    pub config_path: String,
    pub script: Option<String>,
    pub symbols: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub output: Option<String>,
    pub sequential: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    info!("Starting marker run");

    let mut config = Config::from_file(&args.config_path)?;
    info!("Loaded configuration from: {}", args.config_path);

    // Apply overrides
    if let Some(script) = &args.script {
        info!("Overriding script to: {}", script);
        config.set_script_name(script);
    }
    if let Some(symbols) = &args.symbols {
        config.data.symbols = symbols
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        info!("Overriding symbols to: {:?}", config.data.symbols);
    }
    if let Some(output) = &args.output {
        config.export.output_dir = output.clone();
    }

    let start = args.start.as_deref().map(data::parse_date).transpose()?;
    let end = args.end.as_deref().map(data::parse_date).transpose()?;

    let settings = EngineSettings {
        period: config.period()?,
        timezone: config.timezone()?,
    };
    let script = scripts::create_script(&config)?;
    info!(
        "Script '{}' on {} bars, exchange time zone {}",
        script.name(),
        settings.period,
        settings.timezone
    );

    let earnings = match &config.market.earnings_file {
        Some(path) => Some(
            EarningsCalendar::load_csv(path)
                .with_context(|| format!("Failed to load earnings calendar {}", path))?,
        ),
        None => None,
    };

    let engine = MarkerEngine::new(script, settings, earnings)?;

    info!("Loading data from: {}", config.data.data_dir);
    let symbols: Vec<Symbol> = config.symbols();
    debug!("Symbols: {:?}", symbols);
    let bars = data::load_multi_symbol_with_range(
        &config.data.data_dir,
        &symbols,
        &config.market.timeframe,
        start,
        end,
    )?;

    for (symbol, series) in &bars {
        let check = data::validate_bars(series);
        for warning in &check.warnings {
            warn!("{}: {}", symbol, warning);
        }
    }

    let runs = engine.run(&bars, args.sequential);
    let paths = export::export_run(&config.export.output_dir, &runs, config.export.format)?;

    let (evaluated, fired, skipped, markers) = totals(&runs);

    println!("\n{}", "=".repeat(60));
    println!("MARKER RUN: {}", engine.script().name());
    println!("{}", "=".repeat(60));
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10}",
        "Symbol", "Evaluated", "Fired", "Skipped", "Markers"
    );
    println!("{}", "-".repeat(60));
    for run in &runs {
        println!(
            "{:<12} {:>10} {:>10} {:>10} {:>10}",
            run.symbol.as_str(),
            run.bars_evaluated,
            run.bars_fired,
            run.bars_skipped,
            run.markers.len()
        );
    }
    println!("{}", "-".repeat(60));
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10}",
        "Total", evaluated, fired, skipped, markers
    );
    println!("{}", "=".repeat(60));
    if let Some(path) = &paths.csv {
        println!("Markers CSV:  {}", path.display());
    }
    if let Some(path) = &paths.json {
        println!("Markers JSON: {}", path.display());
    }

    info!("Marker run completed successfully");

    Ok(())
}
