//! Seeded synthetic cumulative-count series.
//!
//! Used by `gc demo` and by tests: evaluate a growth curve on days `1..=n`,
//! add Gaussian noise, then clamp so the result is a valid cumulative series.

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{ModelKind, TimeSeries};
use crate::error::AppError;
use crate::models::evaluate;

/// Parameters for one synthetic series.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub model: ModelKind,
    pub theta: Vec<f64>,
    pub n: usize,
    pub noise_sd: f64,
    pub seed: u64,
    pub start: NaiveDate,
}

impl SampleSpec {
    /// A curve of the given form that is still growing after `n` days, with
    /// its asymptote near 1000.
    pub fn demo(model: ModelKind, n: usize, noise_sd: f64, seed: u64, start: NaiveDate) -> Self {
        let span = n.max(4) as f64;
        let theta = match model {
            ModelKind::Exponential => vec![5.0, 5.0 / span],
            ModelKind::Logistic => vec![1000.0, 0.6 * span, span / 8.0],
            ModelKind::Gompertz => vec![1000.0, 8.0, 4.0 / span],
            ModelKind::Richards => vec![1000.0, 2.5 / span, 3.0],
        };
        Self {
            model,
            theta,
            n,
            noise_sd,
            seed,
            start,
        }
    }
}

/// Draw the series described by `spec`.
///
/// Noisy values are floored at zero and carried forward as a running maximum,
/// so the output always satisfies the cumulative-series invariants.
pub fn simulate_series(spec: &SampleSpec) -> Result<TimeSeries, AppError> {
    if spec.n == 0 {
        return Err(AppError::new(2, "Sample length must be > 0."));
    }
    if spec.theta.len() != spec.model.param_count() {
        return Err(AppError::new(
            2,
            format!(
                "{} needs {} parameters, got {}.",
                spec.model,
                spec.model.param_count(),
                spec.theta.len()
            ),
        ));
    }
    let normal = Normal::new(0.0, spec.noise_sd)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let mut counts = Vec::with_capacity(spec.n);
    let mut running = 0.0_f64;
    for i in 1..=spec.n {
        let clean = evaluate(spec.model, &spec.theta, i as f64);
        let noisy = clean + normal.sample(&mut rng);
        if !noisy.is_finite() {
            return Err(AppError::new(2, format!("Non-finite sample value on day {i}.")));
        }
        running = running.max(noisy.max(0.0));
        counts.push(running);
    }

    Ok(TimeSeries::from_counts(spec.start, &counts)?)
}
