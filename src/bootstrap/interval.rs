//! Prediction intervals from refits on block-resampled residuals.
//!
//! For each replicate `b`:
//! 1. resample the fit residuals in circular blocks
//! 2. `y* = f(x; θ̂) + e*`
//! 3. refit from `θ̂` and evaluate `f(x_future; θ*)`
//!
//! Bounds are the empirical `α/2` and `1 − α/2` quantiles of the draws at each
//! future index, where `α = 1 − level`.
//!
//! Replicate seeds come from one master `StdRng`, drawn up front in replicate
//! order, so the draws do not depend on how rayon schedules the work.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bootstrap::blocks::resample_blocks;
use crate::bootstrap::{BootstrapConfig, CancelToken};
use crate::domain::ModelKind;
use crate::error::ModelError;
use crate::fit::{FitOptions, FittedModel, fit};
use crate::math::quantile_sorted;

/// Interval at one future index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalBound {
    pub x: f64,
    /// Point forecast `f(x; θ̂)`.
    pub fit: f64,
    pub lwr: f64,
    pub upr: f64,
}

/// Bootstrap result for one fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapIntervals {
    pub model: ModelKind,
    pub level: f64,
    pub block_length: usize,
    pub requested: usize,
    /// Replicates whose refit produced a finite forecast.
    pub achieved: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub min_required: usize,
    pub bounds: Vec<IntervalBound>,
}

impl BootstrapIntervals {
    pub fn bound_at(&self, x: f64) -> Option<&IntervalBound> {
        self.bounds.iter().find(|b| b.x == x)
    }

    /// Warning to surface when fewer replicates succeeded than required.
    pub fn underreplication(&self) -> Option<ModelError> {
        (self.achieved < self.min_required).then_some(ModelError::BootstrapUnderreplicated {
            model: self.model,
            achieved: self.achieved,
            requested: self.requested,
        })
    }
}

/// Per-replicate outcome. Lives only while one interval is computed.
#[derive(Debug, Clone)]
enum BootstrapReplicate {
    Draw(Vec<f64>),
    Failed,
    Cancelled,
}

/// Bootstrap intervals using the model's default fit options for refits.
pub fn predict_interval(
    fitted: &FittedModel,
    x: &[f64],
    future_x: &[f64],
    config: &BootstrapConfig,
    cancel: Option<&CancelToken>,
) -> Result<BootstrapIntervals, ModelError> {
    let opts = FitOptions::for_model(fitted.model);
    predict_interval_with(fitted, x, future_x, &opts, config, cancel)
}

/// Bootstrap intervals with explicit refit options.
///
/// Only `future_x` values beyond the largest observed `x` get a bound. Failed
/// and cancelled replicates are dropped; fewer than two usable draws is an
/// error, anything short of `config.min_required()` is flagged through
/// [`BootstrapIntervals::underreplication`].
pub fn predict_interval_with(
    fitted: &FittedModel,
    x: &[f64],
    future_x: &[f64],
    fit_opts: &FitOptions,
    config: &BootstrapConfig,
    cancel: Option<&CancelToken>,
) -> Result<BootstrapIntervals, ModelError> {
    config.validate()?;
    let model = fitted.model;
    let n = x.len();
    if fitted.residuals.len() != n || fitted.fitted.len() != n {
        return Err(ModelError::InvalidConfig(format!(
            "{model}: fitted model has {} residuals but {n} observations were given",
            fitted.residuals.len()
        )));
    }

    let last_x = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let targets: Vec<f64> = future_x
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > last_x)
        .collect();

    let block_length = config.block_length.resolve(n);
    let mut out = BootstrapIntervals {
        model,
        level: config.level,
        block_length,
        requested: config.replicates,
        achieved: 0,
        failed: 0,
        cancelled: 0,
        min_required: config.min_required(),
        bounds: Vec::new(),
    };
    if targets.is_empty() || config.replicates == 0 {
        return Ok(out);
    }

    let mut master = StdRng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..config.replicates).map(|_| master.next_u64()).collect();
    let deadline = config.time_budget.map(|budget| Instant::now() + budget);

    let run = |seed: &u64| -> BootstrapReplicate {
        let stopped = cancel.is_some_and(CancelToken::is_cancelled)
            || deadline.is_some_and(|d| Instant::now() >= d);
        if stopped {
            return BootstrapReplicate::Cancelled;
        }

        let mut rng = StdRng::seed_from_u64(*seed);
        let resampled = resample_blocks(&fitted.residuals, block_length, &mut rng);
        let y_star: Vec<f64> = fitted
            .fitted
            .iter()
            .zip(&resampled)
            .map(|(f, e)| f + e)
            .collect();

        match fit(model, x, &y_star, &fitted.theta, fit_opts) {
            Ok(refit) => {
                let draw = refit.predict_all(&targets);
                if draw.iter().all(|v| v.is_finite()) {
                    BootstrapReplicate::Draw(draw)
                } else {
                    BootstrapReplicate::Failed
                }
            }
            Err(err) => {
                debug!(model = %model, error = %err, "bootstrap refit dropped");
                BootstrapReplicate::Failed
            }
        }
    };

    let outcomes: Vec<BootstrapReplicate> = if config.parallel {
        seeds.par_iter().map(run).collect()
    } else {
        seeds.iter().map(run).collect()
    };

    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(outcomes.len()); targets.len()];
    for outcome in outcomes {
        match outcome {
            BootstrapReplicate::Draw(draw) => {
                out.achieved += 1;
                for (column, v) in columns.iter_mut().zip(draw) {
                    column.push(v);
                }
            }
            BootstrapReplicate::Failed => out.failed += 1,
            BootstrapReplicate::Cancelled => out.cancelled += 1,
        }
    }

    if out.achieved < 2 {
        warn!(
            model = %model,
            achieved = out.achieved,
            failed = out.failed,
            cancelled = out.cancelled,
            "bootstrap produced too few draws for an interval"
        );
        return Err(ModelError::BootstrapUnderreplicated {
            model,
            achieved: out.achieved,
            requested: out.requested,
        });
    }

    let alpha = 1.0 - config.level;
    out.bounds = targets
        .iter()
        .zip(columns.iter_mut())
        .map(|(&tx, column)| {
            column.sort_by(f64::total_cmp);
            IntervalBound {
                x: tx,
                fit: fitted.predict(tx),
                lwr: quantile_sorted(column, alpha / 2.0),
                upr: quantile_sorted(column, 1.0 - alpha / 2.0),
            }
        })
        .collect();

    info!(
        model = %model,
        block_length,
        requested = out.requested,
        achieved = out.achieved,
        failed = out.failed,
        cancelled = out.cancelled,
        "bootstrap intervals computed"
    );
    if let Some(issue) = out.underreplication() {
        warn!("{issue}");
    }

    Ok(out)
}
