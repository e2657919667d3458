//! Shared fit pipeline used by every CLI subcommand.
//!
//! Workflow for one series:
//! start values -> NLS fit -> scoring/comparison -> bootstrap intervals -> tables
//!
//! Nothing here is fatal past configuration validation: a model that cannot
//! be fitted is recorded in `failures` and the remaining models carry on.

use serde::Serialize;
use tracing::{info, warn};

use crate::bootstrap::{BootstrapIntervals, CancelToken, predict_interval_with};
use crate::domain::{ModelKind, PipelineConfig, SeriesStats, TimeSeries};
use crate::error::ModelError;
use crate::fit::{FittedModel, ModelComparison, compare, fit_series, score};
use crate::models::{StartOptions, start_values};
use crate::report::{ForecastRow, NextDayRow, Prediction, aggregate, next_day, point_forecast_table};

/// A model that was excluded from comparison and forecasts.
#[derive(Debug, Clone, Serialize)]
pub struct ModelFailure {
    pub model: ModelKind,
    pub kind: &'static str,
    pub reason: String,
}

impl ModelFailure {
    fn from_error(model: ModelKind, err: &ModelError) -> Self {
        Self {
            model,
            kind: err.kind_label(),
            reason: err.to_string(),
        }
    }
}

/// All computed outputs of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub stats: SeriesStats,
    pub horizon: usize,
    pub fits: Vec<FittedModel>,
    pub failures: Vec<ModelFailure>,
    pub comparison: ModelComparison,
    pub intervals: Vec<BootstrapIntervals>,
    pub predictions: Vec<Prediction>,
    pub forecast_table: Vec<ForecastRow>,
    pub next_day: Vec<NextDayRow>,
    pub warnings: Vec<String>,
}

impl RunOutput {
    pub fn fit_for(&self, model: ModelKind) -> Option<&FittedModel> {
        self.fits.iter().find(|f| f.model == model)
    }
}

/// Fit, compare and forecast every configured model on one series.
pub fn run_pipeline(
    series: &TimeSeries,
    config: &PipelineConfig,
    cancel: Option<&CancelToken>,
) -> Result<RunOutput, ModelError> {
    config.validate()?;
    let stats = series
        .stats()
        .ok_or_else(|| ModelError::InvalidConfig("series is empty".to_string()))?;

    // Fit order follows the catalog so the logistic asymptote is known before
    // Gompertz and Richards need it.
    let order: Vec<ModelKind> = ModelKind::ALL
        .iter()
        .copied()
        .filter(|m| config.models.contains(m))
        .collect();

    let mut fits: Vec<FittedModel> = Vec::new();
    let mut failures: Vec<ModelFailure> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut start_opts = StartOptions {
        asymptote_hint: None,
        richards: config.richards_start,
    };

    for model in order {
        match fit_one(model, series, config, &start_opts) {
            Ok(fitted) => {
                info!(
                    model = %model,
                    theta = ?fitted.theta,
                    rss = fitted.rss,
                    iterations = fitted.iterations,
                    "model fitted"
                );
                if model == ModelKind::Logistic {
                    start_opts.asymptote_hint = fitted.theta.first().copied();
                }
                fits.push(fitted);
            }
            Err(err) => {
                warn!(model = %model, "{err}");
                failures.push(ModelFailure::from_error(model, &err));
            }
        }
    }

    let scores: Vec<_> = fits.iter().map(|f| score(f, series.y())).collect();
    for issue in scores.iter().filter_map(|s| s.aicc_issue()) {
        warn!("{issue}");
        warnings.push(issue.to_string());
    }
    let comparison = compare(&scores);

    let intervals = if config.bootstrap.replicates > 0 {
        bootstrap_all(series, &fits, config, cancel, &mut warnings)
    } else {
        Vec::new()
    };

    let predictions = aggregate(series, &fits, &intervals, config.horizon);
    let forecast_table = point_forecast_table(series, &fits, config.horizon);
    let next_day_rows = next_day(series, &fits, &intervals);

    Ok(RunOutput {
        stats,
        horizon: config.horizon,
        fits,
        failures,
        comparison,
        intervals,
        predictions,
        forecast_table,
        next_day: next_day_rows,
        warnings,
    })
}

fn fit_one(
    model: ModelKind,
    series: &TimeSeries,
    config: &PipelineConfig,
    start_opts: &StartOptions,
) -> Result<FittedModel, ModelError> {
    let theta0 = start_values(model, series.x(), series.y(), start_opts)?;
    fit_series(model, series, &theta0, &config.fit_options(model))
}

fn bootstrap_all(
    series: &TimeSeries,
    fits: &[FittedModel],
    config: &PipelineConfig,
    cancel: Option<&CancelToken>,
    warnings: &mut Vec<String>,
) -> Vec<BootstrapIntervals> {
    let last = series.last_x();
    let future_x: Vec<f64> = (1..=config.horizon).map(|h| last + h as f64).collect();

    let mut out = Vec::with_capacity(fits.len());
    for fitted in fits {
        let opts = config.fit_options(fitted.model);
        match predict_interval_with(fitted, series.x(), &future_x, &opts, &config.bootstrap, cancel) {
            Ok(intervals) => {
                if let Some(issue) = intervals.underreplication() {
                    warnings.push(issue.to_string());
                }
                out.push(intervals);
            }
            Err(err) => {
                warn!(model = %fitted.model, "no prediction interval: {err}");
                warnings.push(err.to_string());
            }
        }
    }
    out
}
