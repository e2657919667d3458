//! Shared domain types.
//!
//! This module defines:
//!
//! - the growth-model catalog (`ModelKind`)
//! - the validated cumulative-count series (`TimeSeries`)
//! - the run configuration understood by the pipeline (`PipelineConfig`)

use chrono::{Duration, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::bootstrap::BootstrapConfig;
use crate::error::{ModelError, SeriesError};
use crate::fit::FitOptions;
use crate::models::RichardsStart;

/// The closed catalog of growth-curve forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `θ1·exp(θ2·x)`
    Exponential,
    /// `θ1 / (1 + exp((θ2 − x)/θ3))`
    Logistic,
    /// `θ1·exp(−θ2·exp(−θ3·x))`
    Gompertz,
    /// `θ1·(1 − exp(−θ2·x))^θ3`
    Richards,
}

impl ModelKind {
    /// Fit order used by the pipeline. Logistic comes first because its fitted
    /// asymptote seeds the Gompertz and Richards starts.
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Logistic,
        ModelKind::Exponential,
        ModelKind::Gompertz,
        ModelKind::Richards,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Exponential => "Exponential",
            ModelKind::Logistic => "Logistic",
            ModelKind::Gompertz => "Gompertz",
            ModelKind::Richards => "Richards",
        }
    }

    /// Number of curve parameters (θ).
    pub fn param_count(self) -> usize {
        match self {
            ModelKind::Exponential => 2,
            ModelKind::Logistic | ModelKind::Gompertz | ModelKind::Richards => 3,
        }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Exponential => &["scale", "rate"],
            ModelKind::Logistic => &["asymptote", "midpoint", "scale"],
            ModelKind::Gompertz => &["asymptote", "displacement", "rate"],
            ModelKind::Richards => &["asymptote", "rate", "shape"],
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A validated cumulative-count series for one region.
///
/// `x` is the 1-based day index; it is stored as `f64` because every consumer
/// feeds it straight into model evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Summary stats about a series (for report headers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStats {
    pub n: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub y_min: f64,
    pub y_max: f64,
}

impl TimeSeries {
    /// Build a series from `(date, cumulative_count)` records sorted by date.
    pub fn from_records(records: &[(NaiveDate, f64)]) -> Result<Self, SeriesError> {
        if records.is_empty() {
            return Err(SeriesError::Empty);
        }

        let mut dates = Vec::with_capacity(records.len());
        let mut x = Vec::with_capacity(records.len());
        let mut y = Vec::with_capacity(records.len());

        for (i, &(date, value)) in records.iter().enumerate() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SeriesError::InvalidCount { date, value });
            }
            if let Some(&previous) = dates.last() {
                let expected = next_day(previous);
                if expected != Some(date) {
                    return Err(SeriesError::NotConsecutive {
                        previous,
                        expected: expected.unwrap_or(previous),
                        found: date,
                    });
                }
            }
            if let Some(&prev_y) = y.last() {
                if value < prev_y {
                    return Err(SeriesError::Decreasing {
                        date,
                        previous: prev_y,
                        value,
                    });
                }
            }
            dates.push(date);
            x.push((i + 1) as f64);
            y.push(value);
        }

        Ok(Self { dates, x, y })
    }

    /// Build a series of consecutive days starting at `start`.
    pub fn from_counts(start: NaiveDate, counts: &[f64]) -> Result<Self, SeriesError> {
        let mut records = Vec::with_capacity(counts.len());
        let mut date = start;
        for (i, &c) in counts.iter().enumerate() {
            if i > 0 {
                date = next_day(date).unwrap_or(date);
            }
            records.push((date, c));
        }
        Self::from_records(&records)
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Largest observed index (equals the series length).
    pub fn last_x(&self) -> f64 {
        self.x.last().copied().unwrap_or(0.0)
    }

    /// Calendar date for a day index, including indices past the last
    /// observation.
    pub fn date_for(&self, x: f64) -> Option<NaiveDate> {
        let start = *self.dates.first()?;
        if !(x.is_finite() && x >= 1.0) {
            return None;
        }
        let offset = x.round() as i64 - 1;
        start.checked_add_signed(Duration::days(offset))
    }

    pub fn stats(&self) -> Option<SeriesStats> {
        let start_date = *self.dates.first()?;
        let end_date = *self.dates.last()?;
        let y_min = self.y.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = self.y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(SeriesStats {
            n: self.len(),
            start_date,
            end_date,
            y_min,
            y_max,
        })
    }
}

fn next_day(date: NaiveDate) -> Option<NaiveDate> {
    date.succ_opt()
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Models to fit, in fit order.
    pub models: Vec<ModelKind>,
    /// Number of days past the last observation to forecast.
    pub horizon: usize,
    /// Per-model fit option overrides; models not listed use
    /// `FitOptions::for_model`.
    pub fit_overrides: Vec<(ModelKind, FitOptions)>,
    /// Starting-value strategy for the Richards model.
    pub richards_start: RichardsStart,
    /// Prediction-interval settings. `replicates = 0` disables the bootstrap.
    pub bootstrap: BootstrapConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            models: ModelKind::ALL.to_vec(),
            horizon: 7,
            fit_overrides: Vec::new(),
            richards_start: RichardsStart::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Fit options for a model: the override when present, else the model default.
    pub fn fit_options(&self, model: ModelKind) -> FitOptions {
        self.fit_overrides
            .iter()
            .find(|(kind, _)| *kind == model)
            .map(|(_, opts)| opts.clone())
            .unwrap_or_else(|| FitOptions::for_model(model))
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.models.is_empty() {
            return Err(ModelError::InvalidConfig("no models selected".to_string()));
        }
        if self.horizon == 0 {
            return Err(ModelError::InvalidConfig("horizon must be >= 1".to_string()));
        }
        for (_, opts) in &self.fit_overrides {
            opts.validate()?;
        }
        self.bootstrap.validate()
    }
}
