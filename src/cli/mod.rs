//! Command-line parsing for the growth-curve forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::bootstrap::BlockLength;
use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gc", version, about = "Growth-curve fitting and forecasting for cumulative counts")]
pub struct Cli {
    /// Log verbosity (error, warn, info, debug, trace). Logs go to stderr.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit growth models to a cumulative-count CSV and forecast.
    Fit(FitArgs),
    /// Fit a seeded synthetic series (no input file needed).
    Demo(DemoArgs),
}

/// Options for `gc fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Input CSV with a header row.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Name of the date column (`%Y-%m-%d`).
    #[arg(long, default_value = "date")]
    pub date_column: String,

    /// Name of the cumulative count column.
    #[arg(long, default_value = "count")]
    pub value_column: String,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Options for `gc demo`.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Curve the synthetic series is drawn from.
    #[arg(long, value_enum, default_value_t = ModelKind::Logistic)]
    pub model: ModelKind,

    /// Number of days to simulate.
    #[arg(long, default_value_t = 30)]
    pub n: usize,

    /// Standard deviation of the Gaussian noise added to each day.
    #[arg(long, default_value_t = 5.0)]
    pub noise: f64,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Modeling options shared by `fit` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Which model(s) to fit (comma separated).
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = ModelKind::ALL.to_vec()
    )]
    pub models: Vec<ModelKind>,

    /// Days to forecast past the last observation.
    #[arg(long, default_value_t = 7)]
    pub horizon: usize,

    /// Bootstrap replicates per model (0 disables intervals).
    #[arg(long, default_value_t = 500)]
    pub replicates: usize,

    /// Block length: `auto` (cube root of n) or a positive integer.
    #[arg(long, default_value = "auto")]
    pub block_length: BlockLength,

    /// Confidence level of the prediction intervals.
    #[arg(long, default_value_t = 0.95)]
    pub level: f64,

    /// Seed for the bootstrap (and for the synthetic series in `demo`).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of replicates that must succeed before intervals are flagged.
    #[arg(long, default_value_t = 0.9)]
    pub min_success: f64,

    /// Wall-clock budget per model for the bootstrap, in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Run bootstrap replicates on the current thread only.
    #[arg(long)]
    pub serial: bool,

    /// Skip the Nelder–Mead refinement of the Richards start.
    #[arg(long)]
    pub richards_seed_only: bool,

    /// Export prediction rows (with interval bounds) to CSV.
    #[arg(long = "export-intervals", value_name = "CSV")]
    pub export_intervals: Option<PathBuf>,

    /// Export the whole run (fits, comparison, intervals, tables) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}
