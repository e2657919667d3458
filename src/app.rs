//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads a CSV series (or simulates one)
//! - runs the fit pipeline
//! - prints reports and writes optional exports

use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};

use crate::bootstrap::BootstrapConfig;
use crate::cli::{Command, DemoArgs, FitArgs, RunArgs};
use crate::data::{SampleSpec, simulate_series};
use crate::domain::{PipelineConfig, TimeSeries};
use crate::error::AppError;
use crate::io::{CsvSpec, load_series, write_predictions_csv, write_run_json};
use crate::models::RichardsStart;

pub mod pipeline;

/// Entry point for the `gc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let spec = CsvSpec {
        date_column: args.date_column.clone(),
        value_column: args.value_column.clone(),
    };
    let ingested = load_series(&args.csv, &spec)?;
    for e in &ingested.row_errors {
        warn!(line = e.line, "skipped row: {}", e.message);
    }
    info!(
        rows_read = ingested.rows_read,
        rows_used = ingested.rows_used,
        "series loaded"
    );

    let source = args.csv.display().to_string();
    run_and_report(&ingested.series, &args.run, &source)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = NaiveDate::from_ymd_opt(2020, 3, 1)
        .ok_or_else(|| AppError::new(2, "Invalid demo start date."))?;
    let spec = SampleSpec::demo(args.model, args.n, args.noise, args.run.seed, start);
    let series = simulate_series(&spec)?;

    let source = format!(
        "demo {} n={} noise={} seed={}",
        args.model, args.n, args.noise, args.run.seed
    );
    run_and_report(&series, &args.run, &source)
}

fn run_and_report(series: &TimeSeries, args: &RunArgs, source: &str) -> Result<(), AppError> {
    let config = pipeline_config_from_args(args);
    let run = pipeline::run_pipeline(series, &config, None)
        .map_err(|e| AppError::new(2, e.to_string()))?;

    println!("{}", crate::report::format_run_summary(&run, source));
    println!("{}", crate::report::format_forecasts(&run));

    if let Some(path) = &args.export_intervals {
        write_predictions_csv(path, &run.predictions)?;
        info!(path = %path.display(), "wrote prediction CSV");
    }
    if let Some(path) = &args.export_json {
        write_run_json(path, source, &run)?;
        info!(path = %path.display(), "wrote run JSON");
    }

    if run.fits.is_empty() {
        return Err(AppError::new(3, "No model could be fitted to the series."));
    }
    Ok(())
}

pub fn pipeline_config_from_args(args: &RunArgs) -> PipelineConfig {
    let richards_start = if args.richards_seed_only {
        let (rate_seed, shape_seed) = RichardsStart::default().seeds();
        RichardsStart::Seed {
            rate_seed,
            shape_seed,
        }
    } else {
        RichardsStart::default()
    };

    PipelineConfig {
        models: args.models.clone(),
        horizon: args.horizon,
        fit_overrides: Vec::new(),
        richards_start,
        bootstrap: BootstrapConfig {
            block_length: args.block_length,
            replicates: args.replicates,
            level: args.level,
            seed: args.seed,
            min_success_ratio: args.min_success,
            parallel: !args.serial,
            time_budget: args.timeout_secs.map(Duration::from_secs),
        },
    }
}
