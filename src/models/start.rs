//! Deterministic starting values for each growth form.
//!
//! Nonlinear least squares only converges from a reasonable θ0, so every model
//! carries its own self-start rule:
//!
//! - Exponential: OLS of `ln(y + 1)` on `x`.
//! - Logistic: logit linearization against an empirical ceiling, then a
//!   closed-form asymptote given midpoint and scale.
//! - Gompertz: double-log linearization below an asymptote bound.
//! - Richards: no closed form; a Nelder–Mead search on the raw SSE from a seed.
//!
//! Gompertz and Richards need an asymptote. The pipeline passes the fitted
//! logistic asymptote as a hint; without one we fall back to the logistic
//! start value.

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use tracing::{debug, warn};

use crate::domain::ModelKind;
use crate::error::ModelError;
use crate::math::fit_line;
use crate::models::evaluate;

/// Inflation applied to `max(y)` to get the logistic ceiling seed.
const CEILING_FACTOR: f64 = 1.05;

/// Relative edge length of the initial Nelder–Mead simplex.
const SIMPLEX_STEP: f64 = 0.1;

/// Cost reported to the simplex search for parameters the curve cannot
/// evaluate (e.g. a non-positive Richards rate).
const NON_FINITE_COST: f64 = 1e300;

/// How to seed the Richards model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RichardsStart {
    /// Seed, then refine by minimizing the SSE with Nelder–Mead.
    NelderMead {
        rate_seed: f64,
        shape_seed: f64,
        max_iter: u64,
    },
    /// Use the seed as-is.
    Seed { rate_seed: f64, shape_seed: f64 },
}

impl Default for RichardsStart {
    fn default() -> Self {
        RichardsStart::NelderMead {
            rate_seed: 0.05,
            shape_seed: 1.0,
            max_iter: 500,
        }
    }
}

impl RichardsStart {
    /// `(rate_seed, shape_seed)` regardless of strategy.
    pub fn seeds(self) -> (f64, f64) {
        match self {
            RichardsStart::NelderMead {
                rate_seed,
                shape_seed,
                ..
            }
            | RichardsStart::Seed {
                rate_seed,
                shape_seed,
            } => (rate_seed, shape_seed),
        }
    }
}

/// Inputs that shape the start heuristics.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Asymptote bound for Gompertz/Richards (normally the fitted logistic θ1).
    pub asymptote_hint: Option<f64>,
    pub richards: RichardsStart,
}

/// Compute θ0 for `model` from the observed `(x, y)`.
pub fn start_values(
    model: ModelKind,
    x: &[f64],
    y: &[f64],
    opts: &StartOptions,
) -> Result<Vec<f64>, ModelError> {
    if x.len() != y.len() || x.is_empty() {
        return Err(undefined(model, "empty or mismatched series"));
    }

    let theta = match model {
        ModelKind::Exponential => exponential_start(x, y)?,
        ModelKind::Logistic => logistic_start(x, y)?,
        ModelKind::Gompertz => {
            let asym = asymptote_bound(x, y, opts.asymptote_hint)?;
            gompertz_start(x, y, asym)?
        }
        ModelKind::Richards => {
            let asym = asymptote_bound(x, y, opts.asymptote_hint)?;
            richards_start(x, y, asym, opts.richards)?
        }
    };

    debug!(model = %model, theta = ?theta, "start values");
    Ok(theta)
}

fn exponential_start(x: &[f64], y: &[f64]) -> Result<Vec<f64>, ModelError> {
    let log_y: Vec<f64> = y.iter().map(|v| (v + 1.0).ln()).collect();
    let line = fit_line(x, &log_y)
        .ok_or_else(|| undefined(ModelKind::Exponential, "log-linear regression is degenerate"))?;

    // ln(θ1) is only trusted when positive; otherwise start from unit scale.
    let scale = if line.intercept > 0.0 {
        line.intercept.exp()
    } else {
        1.0
    };
    Ok(vec![scale, line.slope])
}

fn logistic_start(x: &[f64], y: &[f64]) -> Result<Vec<f64>, ModelError> {
    let y_max = y.iter().copied().fold(0.0_f64, f64::max);
    if y_max <= 0.0 {
        return Err(undefined(ModelKind::Logistic, "all counts are zero"));
    }
    let ceiling = CEILING_FACTOR * y_max;

    let (xs, logits): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|&(_, &v)| v > 0.0)
        .map(|(&xi, &v)| {
            let p = v / ceiling;
            (xi, (p / (1.0 - p)).ln())
        })
        .unzip();

    let (midpoint, scale) = match fit_line(&xs, &logits) {
        Some(line) if line.slope > 0.0 && line.intercept.is_finite() => {
            (-line.intercept / line.slope, 1.0 / line.slope)
        }
        _ => steepest_growth(x, y, ceiling)?,
    };

    // With midpoint and scale fixed the model is linear in the asymptote.
    let mut num = 0.0;
    let mut den = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let g = evaluate(ModelKind::Logistic, &[1.0, midpoint, scale], xi);
        num += yi * g;
        den += g * g;
    }
    let asym = if den > 0.0 && (num / den).is_finite() && num / den > 0.0 {
        num / den
    } else {
        ceiling
    };

    Ok(vec![asym, midpoint, scale])
}

/// Midpoint at the largest daily increment; scale from the peak growth rate
/// of a logistic (`θ1 / (4·θ3)`).
fn steepest_growth(x: &[f64], y: &[f64], ceiling: f64) -> Result<(f64, f64), ModelError> {
    let mut best: Option<(usize, f64)> = None;
    for i in 1..y.len() {
        let inc = y[i] - y[i - 1];
        if inc > best.map_or(0.0, |(_, b)| b) {
            best = Some((i, inc));
        }
    }
    let Some((i, max_inc)) = best else {
        return Err(undefined(ModelKind::Logistic, "series has no growth"));
    };

    let asym = (2.0 * y[i]).max(ceiling);
    Ok((x[i], asym / (4.0 * max_inc)))
}

fn asymptote_bound(x: &[f64], y: &[f64], hint: Option<f64>) -> Result<f64, ModelError> {
    match hint {
        Some(a) if a.is_finite() && a > 0.0 => Ok(a),
        _ => Ok(logistic_start(x, y)?[0]),
    }
}

fn gompertz_start(x: &[f64], y: &[f64], asym: f64) -> Result<Vec<f64>, ModelError> {
    if let Some(&v) = y.iter().find(|&&v| v >= asym) {
        return Err(undefined(
            ModelKind::Gompertz,
            &format!("count {v} reaches the asymptote bound {asym:.3}"),
        ));
    }

    let ln_asym = asym.ln();
    let (xs, ll): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|&(_, &v)| v > 0.0)
        .map(|(&xi, &v)| (xi, (ln_asym - v.ln()).ln()))
        .unzip();

    let line = fit_line(&xs, &ll)
        .ok_or_else(|| undefined(ModelKind::Gompertz, "double-log regression is degenerate"))?;

    let displacement = line.intercept.exp();
    let rate = -line.slope;
    if !(displacement.is_finite() && displacement > 0.0 && rate.is_finite()) {
        return Err(undefined(
            ModelKind::Gompertz,
            &format!("linearization produced displacement={displacement}, rate={rate}"),
        ));
    }
    Ok(vec![asym, displacement, rate])
}

/// Raw SSE of the Richards curve, exposed to argmin.
struct RichardsLoss<'a> {
    x: &'a [f64],
    y: &'a [f64],
}

impl RichardsLoss<'_> {
    fn sse(&self, theta: &[f64]) -> f64 {
        let sse: f64 = self
            .x
            .iter()
            .zip(self.y)
            .map(|(&xi, &yi)| {
                let r = yi - evaluate(ModelKind::Richards, theta, xi);
                r * r
            })
            .sum();
        if sse.is_finite() { sse } else { NON_FINITE_COST }
    }
}

impl CostFunction for RichardsLoss<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok(self.sse(theta))
    }
}

fn richards_start(
    x: &[f64],
    y: &[f64],
    asym: f64,
    strategy: RichardsStart,
) -> Result<Vec<f64>, ModelError> {
    let (rate_seed, shape_seed) = strategy.seeds();
    let seed = vec![asym, rate_seed, shape_seed];
    let loss = RichardsLoss { x, y };
    let seed_cost = loss.sse(&seed);

    let theta = match strategy {
        RichardsStart::Seed { .. } => seed,
        RichardsStart::NelderMead { max_iter, .. } => {
            match nelder_mead(RichardsLoss { x, y }, &seed, max_iter) {
                Ok((best, cost)) if cost < seed_cost => best,
                Ok(_) => seed,
                Err(e) => {
                    warn!(error = %e, "Richards simplex search failed; using seed");
                    seed
                }
            }
        }
    };

    if theta.iter().any(|v| !v.is_finite()) || loss.sse(&theta) >= NON_FINITE_COST {
        return Err(undefined(
            ModelKind::Richards,
            "start search ended on a non-finite curve",
        ));
    }
    Ok(theta)
}

fn nelder_mead(
    loss: RichardsLoss<'_>,
    seed: &[f64],
    max_iter: u64,
) -> Result<(Vec<f64>, f64), argmin::core::Error> {
    let mut simplex = Vec::with_capacity(seed.len() + 1);
    simplex.push(seed.to_vec());
    for j in 0..seed.len() {
        let mut vertex = seed.to_vec();
        vertex[j] = if vertex[j] != 0.0 {
            vertex[j] * (1.0 + SIMPLEX_STEP)
        } else {
            SIMPLEX_STEP
        };
        simplex.push(vertex);
    }

    let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(simplex).with_sd_tolerance(1e-10)?;
    let result = Executor::new(loss, solver)
        .configure(|state| state.max_iters(max_iter))
        .run()?;

    let mut state = result.state().clone();
    let cost = state.get_best_cost();
    let best = state
        .take_best_param()
        .ok_or_else(|| argmin::core::Error::msg("simplex search returned no parameters"))?;
    Ok((best, cost))
}

fn undefined(model: ModelKind, reason: &str) -> ModelError {
    ModelError::StartValueUndefined {
        model,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluate_all;

    fn xs(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn exponential_start_uses_log_regression() {
        let x = xs(6);
        let y = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
        let theta = start_values(ModelKind::Exponential, &x, &y, &StartOptions::default()).unwrap();
        // ln(y+1) grows a bit slower than ln(y), but the slope is in range.
        assert!(theta[1] > 0.5 && theta[1] < 0.7, "rate={}", theta[1]);
        assert!(theta[0] > 0.0);
    }

    #[test]
    fn exponential_start_falls_back_to_unit_scale() {
        // Intercept of ln(y+1) on x is negative here.
        let x = xs(4);
        let y = [0.0, 1.0, 3.0, 7.0];
        let theta = start_values(ModelKind::Exponential, &x, &y, &StartOptions::default()).unwrap();
        assert_eq!(theta[0], 1.0);
    }

    #[test]
    fn logistic_start_lands_near_truth() {
        let x = xs(20);
        let y = evaluate_all(ModelKind::Logistic, &[1000.0, 10.0, 3.0], &x);
        let theta = start_values(ModelKind::Logistic, &x, &y, &StartOptions::default()).unwrap();
        assert!((theta[0] - 1000.0).abs() < 200.0, "asym={}", theta[0]);
        assert!((theta[1] - 10.0).abs() < 3.0, "mid={}", theta[1]);
        assert!(theta[2] > 1.0 && theta[2] < 6.0, "scale={}", theta[2]);
    }

    #[test]
    fn logistic_start_rejects_all_zero_series() {
        let x = xs(5);
        let err = start_values(ModelKind::Logistic, &x, &[0.0; 5], &StartOptions::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::StartValueUndefined { .. }));
    }

    #[test]
    fn gompertz_start_reports_counts_at_or_above_bound() {
        let x = xs(5);
        let y = [10.0, 20.0, 40.0, 80.0, 100.0];
        let opts = StartOptions {
            asymptote_hint: Some(90.0),
            ..StartOptions::default()
        };
        let err = start_values(ModelKind::Gompertz, &x, &y, &opts).unwrap_err();
        match err {
            ModelError::StartValueUndefined { model, reason } => {
                assert_eq!(model, ModelKind::Gompertz);
                assert!(reason.contains("asymptote"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gompertz_start_is_exact_with_true_asymptote() {
        let x = xs(30);
        let truth = [1000.0, 6.0, 0.1];
        let y = evaluate_all(ModelKind::Gompertz, &truth, &x);
        let opts = StartOptions {
            asymptote_hint: Some(1000.0),
            ..StartOptions::default()
        };
        let theta = start_values(ModelKind::Gompertz, &x, &y, &opts).unwrap();
        assert!((theta[1] - 6.0).abs() < 1e-6);
        assert!((theta[2] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn richards_search_improves_on_seed() {
        let x = xs(40);
        let y = evaluate_all(ModelKind::Richards, &[1000.0, 0.1, 3.0], &x);
        let opts = StartOptions {
            asymptote_hint: Some(950.0),
            ..StartOptions::default()
        };
        let searched = start_values(ModelKind::Richards, &x, &y, &opts).unwrap();

        let seeded = start_values(
            ModelKind::Richards,
            &x,
            &y,
            &StartOptions {
                asymptote_hint: Some(950.0),
                richards: RichardsStart::Seed {
                    rate_seed: 0.05,
                    shape_seed: 1.0,
                },
            },
        )
        .unwrap();
        assert_eq!(seeded, vec![950.0, 0.05, 1.0]);

        let loss = RichardsLoss { x: &x, y: &y };
        assert!(loss.sse(&searched) < loss.sse(&seeded));
    }
}
