//! Nonlinear least squares for a single model kind.
//!
//! Given:
//! - indices `x_i`
//! - observed values `y_i`
//! - a starting `θ0`
//!
//! we minimize `Σ (y_i − f(x_i; θ))²` with Levenberg–Marquardt:
//! - each damped step solves the augmented least squares problem
//!   `[J; √λ·D] δ = [r; 0]` (Marquardt scaling `D² = diag(JᵀJ)`)
//! - a step is accepted only if it lowers the RSS to a finite value,
//!   otherwise the damping grows tenfold and the step is retried
//!
//! Convergence is the relative-offset test: the share of the residual norm a
//! full Gauss–Newton step could still explain, `‖J·δ_GN‖ / ‖r‖`, must fall
//! below the tolerance. Noise-free data never gets there (the offset stays
//! near 1 while `r → 0`), so an exact-fit floor on the RSS also counts.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::{ModelKind, TimeSeries};
use crate::error::ModelError;
use crate::fit::selection::gaussian_loglik;
use crate::math::{solve_least_squares, sum_of_squares};
use crate::models::{evaluate, evaluate_all, jacobian_row};

/// RSS at or below `EXACT_FIT_RSS · (1 + Σy²)` is treated as an exact fit.
const EXACT_FIT_RSS: f64 = 1e-20;

const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;

/// Optimizer settings for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitOptions {
    /// Maximum number of outer (accepted-step) iterations.
    pub max_iter: usize,
    /// Relative-offset convergence tolerance.
    pub tolerance: f64,
    /// Starting Levenberg–Marquardt damping.
    pub initial_damping: f64,
}

impl FitOptions {
    /// Model defaults. Richards is the most prone to wandering off, so it gets
    /// a looser tolerance and a shorter leash.
    pub fn for_model(model: ModelKind) -> Self {
        match model {
            ModelKind::Exponential | ModelKind::Logistic | ModelKind::Gompertz => Self {
                max_iter: 200,
                tolerance: 1e-6,
                initial_damping: 1e-3,
            },
            ModelKind::Richards => Self {
                max_iter: 100,
                tolerance: 1e-4,
                initial_damping: 1e-3,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.max_iter == 0 {
            return Err(ModelError::InvalidConfig("max_iter must be >= 1".to_string()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        if !(self.initial_damping.is_finite() && self.initial_damping > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "initial_damping must be finite and > 0, got {}",
                self.initial_damping
            )));
        }
        Ok(())
    }
}

/// A fitted curve. Produced once by [`fit`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedModel {
    pub model: ModelKind,
    pub theta: Vec<f64>,
    pub fitted: Vec<f64>,
    /// `y − f(x; θ̂)` per observation.
    pub residuals: Vec<f64>,
    pub rss: f64,
    /// `RSS / (n − p)`.
    pub residual_variance: f64,
    pub loglik: f64,
    pub n: usize,
    pub param_count: usize,
    pub iterations: usize,
    pub converged: bool,
}

impl FittedModel {
    pub fn predict(&self, x: f64) -> f64 {
        evaluate(self.model, &self.theta, x)
    }

    pub fn predict_all(&self, xs: &[f64]) -> Vec<f64> {
        evaluate_all(self.model, &self.theta, xs)
    }

    /// Degrees of freedom for information criteria (θ plus the residual variance).
    pub fn df(&self) -> usize {
        self.param_count + 1
    }
}

/// Fit `model` to a validated series.
pub fn fit_series(
    model: ModelKind,
    series: &TimeSeries,
    theta0: &[f64],
    opts: &FitOptions,
) -> Result<FittedModel, ModelError> {
    fit(model, series.x(), series.y(), theta0, opts)
}

/// Fit `model` to raw `(x, y)`.
///
/// `y` is not required to be monotone: the bootstrap feeds synthetic series
/// through here.
pub fn fit(
    model: ModelKind,
    x: &[f64],
    y: &[f64],
    theta0: &[f64],
    opts: &FitOptions,
) -> Result<FittedModel, ModelError> {
    opts.validate()?;

    let p = model.param_count();
    let n = x.len();
    if y.len() != n {
        return Err(ModelError::InvalidConfig(format!(
            "x has {n} values but y has {}",
            y.len()
        )));
    }
    if n < p + 1 {
        return Err(ModelError::InsufficientData {
            model,
            required: p + 1,
            actual: n,
        });
    }
    if theta0.len() != p {
        return Err(ModelError::InvalidStart {
            model,
            reason: format!("expected {p} parameters, got {}", theta0.len()),
        });
    }

    let mut theta = theta0.to_vec();
    let mut residuals = residuals_at(model, &theta, x, y);
    let mut rss = sum_of_squares(&residuals);
    if !rss.is_finite() {
        return Err(ModelError::InvalidStart {
            model,
            reason: format!("non-finite predictions at θ0={theta0:?}"),
        });
    }

    let scale = 1.0 + sum_of_squares(y);
    let mut lambda = opts.initial_damping;
    let mut jac = DMatrix::<f64>::zeros(n, p);
    let mut iterations = 0;

    while iterations < opts.max_iter {
        if !fill_jacobian(model, &theta, x, &mut jac) {
            debug!(model = %model, iterations, "non-finite Jacobian");
            break;
        }
        if is_converged(rss, scale, &jac, &residuals, opts.tolerance) {
            return Ok(finish(model, theta, x, residuals, rss, iterations, true));
        }

        iterations += 1;
        let diag: Vec<f64> = (0..p)
            .map(|j| jac.column(j).norm_squared().max(MIN_DAMPING))
            .collect();

        let mut accepted = false;
        while lambda <= MAX_DAMPING {
            let step = damped_step(&jac, &residuals, &diag, lambda);
            if let Some(step) = step {
                let candidate: Vec<f64> = theta.iter().zip(step.iter()).map(|(t, d)| t + d).collect();
                let cand_residuals = residuals_at(model, &candidate, x, y);
                let cand_rss = sum_of_squares(&cand_residuals);
                if cand_rss.is_finite() && cand_rss < rss {
                    trace!(model = %model, iterations, rss = cand_rss, lambda, "step accepted");
                    theta = candidate;
                    residuals = cand_residuals;
                    rss = cand_rss;
                    lambda = (lambda / 10.0).max(MIN_DAMPING);
                    accepted = true;
                    break;
                }
            }
            lambda *= 10.0;
        }

        if !accepted {
            debug!(model = %model, iterations, rss, "damping exhausted without progress");
            break;
        }
    }

    if fill_jacobian(model, &theta, x, &mut jac)
        && is_converged(rss, scale, &jac, &residuals, opts.tolerance)
    {
        return Ok(finish(model, theta, x, residuals, rss, iterations, true));
    }

    Err(ModelError::FitNonConvergent {
        model,
        iterations,
        best: Box::new(finish(model, theta, x, residuals, rss, iterations, false)),
    })
}

fn residuals_at(model: ModelKind, theta: &[f64], x: &[f64], y: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| yi - evaluate(model, theta, xi))
        .collect()
}

/// Returns `false` if any entry is non-finite.
fn fill_jacobian(model: ModelKind, theta: &[f64], x: &[f64], jac: &mut DMatrix<f64>) -> bool {
    let p = model.param_count();
    let mut row = vec![0.0; p];
    for (i, &xi) in x.iter().enumerate() {
        jacobian_row(model, theta, xi, &mut row);
        for (j, &v) in row.iter().enumerate() {
            if !v.is_finite() {
                return false;
            }
            jac[(i, j)] = v;
        }
    }
    true
}

fn damped_step(
    jac: &DMatrix<f64>,
    residuals: &[f64],
    diag: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let (n, p) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(n + p, p);
    a.view_mut((0, 0), (n, p)).copy_from(jac);
    for j in 0..p {
        a[(n + j, j)] = (lambda * diag[j]).sqrt();
    }

    let mut b = DVector::<f64>::zeros(n + p);
    for (i, &r) in residuals.iter().enumerate() {
        b[i] = r;
    }

    solve_least_squares(&a, &b)
}

fn is_converged(rss: f64, scale: f64, jac: &DMatrix<f64>, residuals: &[f64], tol: f64) -> bool {
    if rss <= EXACT_FIT_RSS * scale {
        return true;
    }
    let r = DVector::from_column_slice(residuals);
    let Some(gn) = solve_least_squares(jac, &r) else {
        return false;
    };
    let offset = (jac * gn).norm() / rss.sqrt();
    offset.is_finite() && offset < tol
}

fn finish(
    model: ModelKind,
    theta: Vec<f64>,
    x: &[f64],
    residuals: Vec<f64>,
    rss: f64,
    iterations: usize,
    converged: bool,
) -> FittedModel {
    let n = x.len();
    let p = model.param_count();
    let fitted = evaluate_all(model, &theta, x);
    FittedModel {
        model,
        theta,
        fitted,
        residuals,
        rss,
        residual_variance: rss / (n - p) as f64,
        loglik: gaussian_loglik(n, rss),
        n,
        param_count: p,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StartOptions, start_values};

    fn xs(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn recovers_parameters_of_noise_free_curves() {
        let cases = [
            (ModelKind::Exponential, vec![2.0, 0.15], vec![2.5, 0.12], 20),
            (ModelKind::Logistic, vec![1000.0, 10.0, 3.0], vec![1200.0, 12.0, 2.0], 20),
            (ModelKind::Gompertz, vec![1000.0, 6.0, 0.1], vec![900.0, 5.0, 0.12], 30),
            (ModelKind::Richards, vec![1000.0, 0.1, 3.0], vec![1100.0, 0.12, 2.5], 40),
        ];

        for (model, truth, start, n) in cases {
            let x = xs(n);
            let y = evaluate_all(model, &truth, &x);
            let fitted = fit(model, &x, &y, &start, &FitOptions::for_model(model))
                .unwrap_or_else(|e| panic!("{model} failed: {e}"));
            assert!(fitted.converged);
            for (j, (est, tru)) in fitted.theta.iter().zip(&truth).enumerate() {
                assert!(
                    (est - tru).abs() <= 1e-4 * tru.abs(),
                    "{model} θ{j}: est={est} truth={tru}"
                );
            }
        }
    }

    #[test]
    fn exponential_doubling_forecasts_next_day() {
        let x = xs(6);
        let y = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
        let theta0 = start_values(ModelKind::Exponential, &x, &y, &StartOptions::default()).unwrap();
        let fitted = fit(
            ModelKind::Exponential,
            &x,
            &y,
            &theta0,
            &FitOptions::for_model(ModelKind::Exponential),
        )
        .unwrap();

        assert!((fitted.theta[1] - 2.0_f64.ln()).abs() < 1e-6);
        assert!((fitted.predict(7.0) - 64.0).abs() < 1e-3);
        assert_eq!(fitted.residuals.len(), 6);
        assert!(fitted.rss < 1e-10);
    }

    #[test]
    fn iteration_budget_exhaustion_returns_best_so_far() {
        let x = xs(20);
        let y = evaluate_all(ModelKind::Logistic, &[1000.0, 10.0, 3.0], &x);
        let start = [300.0, 4.0, 1.0];
        let initial_rss = sum_of_squares(&residuals_at(ModelKind::Logistic, &start, &x, &y));

        let opts = FitOptions {
            max_iter: 1,
            ..FitOptions::for_model(ModelKind::Logistic)
        };
        let err = fit(ModelKind::Logistic, &x, &y, &start, &opts).unwrap_err();
        match &err {
            ModelError::FitNonConvergent { model, iterations, best } => {
                assert_eq!(*model, ModelKind::Logistic);
                assert_eq!(*iterations, 1);
                assert!(!best.converged);
                assert!(best.rss < initial_rss);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.best_fit().is_some());
    }

    #[test]
    fn rejects_underdetermined_and_malformed_starts() {
        let x = xs(3);
        let y = [1.0, 2.0, 3.0];
        let err = fit(
            ModelKind::Logistic,
            &x,
            &y,
            &[3.0, 2.0, 1.0],
            &FitOptions::for_model(ModelKind::Logistic),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::InsufficientData { required: 4, actual: 3, .. }
        ));

        let x = xs(5);
        let y = [1.0, 2.0, 3.0, 4.0, 5.0];
        let err = fit(
            ModelKind::Exponential,
            &x,
            &y,
            &[1.0],
            &FitOptions::for_model(ModelKind::Exponential),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidStart { .. }));
    }

    #[test]
    fn richards_defaults_are_looser() {
        let base = FitOptions::for_model(ModelKind::Logistic);
        let rich = FitOptions::for_model(ModelKind::Richards);
        assert!(rich.tolerance > base.tolerance);
        assert!(rich.max_iter < base.max_iter);
    }
}
