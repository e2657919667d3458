//! Reporting: prediction rows, forecast tables, and formatted terminal output.

pub mod format;

use chrono::NaiveDate;
use serde::Serialize;

use crate::bootstrap::BootstrapIntervals;
use crate::domain::{ModelKind, TimeSeries};
use crate::fit::FittedModel;

pub use format::*;

/// One forecast row per (model, x).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub model: ModelKind,
    pub x: f64,
    pub date: Option<NaiveDate>,
    pub fit: f64,
    pub lwr: Option<f64>,
    pub upr: Option<f64>,
}

/// Fitted values of every model at one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub x: f64,
    pub date: Option<NaiveDate>,
    /// Observed count, for indices inside the series.
    pub observed: Option<f64>,
    pub values: Vec<(ModelKind, f64)>,
}

/// Per-model prediction at the first unobserved day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextDayRow {
    pub model: ModelKind,
    pub x: f64,
    pub date: Option<NaiveDate>,
    pub fit: f64,
    pub lwr: Option<f64>,
    pub upr: Option<f64>,
}

/// Indices `1..=last + horizon`.
fn index_range(series: &TimeSeries, horizon: usize) -> impl Iterator<Item = f64> {
    let end = series.len() + horizon;
    (1..=end).map(|i| i as f64)
}

fn interval_for(intervals: &[BootstrapIntervals], model: ModelKind) -> Option<&BootstrapIntervals> {
    intervals.iter().find(|iv| iv.model == model)
}

fn bounds_at(intervals: &[BootstrapIntervals], model: ModelKind, x: f64) -> (Option<f64>, Option<f64>) {
    interval_for(intervals, model)
        .and_then(|iv| iv.bound_at(x))
        .map_or((None, None), |b| (Some(b.lwr), Some(b.upr)))
}

/// Build the full prediction table.
///
/// Bounds are attached only past the last observation and only for models
/// with a bootstrap result.
pub fn aggregate(
    series: &TimeSeries,
    fits: &[FittedModel],
    intervals: &[BootstrapIntervals],
    horizon: usize,
) -> Vec<Prediction> {
    let last = series.last_x();
    let mut out = Vec::with_capacity(fits.len() * (series.len() + horizon));
    for fitted in fits {
        for x in index_range(series, horizon) {
            let (lwr, upr) = if x > last {
                bounds_at(intervals, fitted.model, x)
            } else {
                (None, None)
            };
            out.push(Prediction {
                model: fitted.model,
                x,
                date: series.date_for(x),
                fit: fitted.predict(x),
                lwr,
                upr,
            });
        }
    }
    out
}

pub fn point_forecast_table(series: &TimeSeries, fits: &[FittedModel], horizon: usize) -> Vec<ForecastRow> {
    index_range(series, horizon)
        .map(|x| ForecastRow {
            x,
            date: series.date_for(x),
            observed: series.y().get(x as usize - 1).copied(),
            values: fits.iter().map(|f| (f.model, f.predict(x))).collect(),
        })
        .collect()
}

pub fn next_day(series: &TimeSeries, fits: &[FittedModel], intervals: &[BootstrapIntervals]) -> Vec<NextDayRow> {
    let x = series.last_x() + 1.0;
    fits.iter()
        .map(|f| {
            let (lwr, upr) = bounds_at(intervals, f.model, x);
            NextDayRow {
                model: f.model,
                x,
                date: series.date_for(x),
                fit: f.predict(x),
                lwr,
                upr,
            }
        })
        .collect()
}
