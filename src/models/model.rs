//! Model evaluation for the four growth forms.
//!
//! The fitter relies on two primitive operations:
//! - predict `f(x; θ)` (for residuals and forecasts)
//! - fill the Jacobian row `∂f/∂θ` at `x` (for Levenberg–Marquardt steps)
//!
//! These are implemented here for each model kind.
//!
//! Numerical notes:
//! - The logistic is evaluated through a sign-split sigmoid so that
//!   `exp((θ2 − x)/θ3)` never overflows on the far tails.
//! - Richards uses `expm1` for `1 − exp(−θ2·x)`, which matters for small rates.

use crate::domain::ModelKind;

/// Predict `f(x; θ)` for the given model kind.
///
/// # Panics
/// Panics if `theta` is shorter than `model.param_count()`.
pub fn evaluate(model: ModelKind, theta: &[f64], x: f64) -> f64 {
    match model {
        ModelKind::Exponential => theta[0] * (theta[1] * x).exp(),
        ModelKind::Logistic => theta[0] * sigmoid((x - theta[1]) / theta[2]),
        ModelKind::Gompertz => theta[0] * (-theta[1] * (-theta[2] * x).exp()).exp(),
        ModelKind::Richards => {
            let u = -(-theta[1] * x).exp_m1();
            theta[0] * u.powf(theta[2])
        }
    }
}

/// Evaluate the model on every `x`.
pub fn evaluate_all(model: ModelKind, theta: &[f64], xs: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| evaluate(model, theta, x)).collect()
}

/// Fill `out` with `∂f/∂θ_j` at `x`.
///
/// # Panics
/// Panics if `theta` or `out` is shorter than `model.param_count()`.
pub fn jacobian_row(model: ModelKind, theta: &[f64], x: f64, out: &mut [f64]) {
    match model {
        ModelKind::Exponential => {
            let e = (theta[1] * x).exp();
            out[0] = e;
            out[1] = theta[0] * x * e;
        }
        ModelKind::Logistic => {
            let (a, s) = (theta[0], theta[2]);
            let z = (x - theta[1]) / s;
            let p = sigmoid(z);
            let dp = p * (1.0 - p);
            out[0] = p;
            out[1] = -a * dp / s;
            out[2] = -a * dp * z / s;
        }
        ModelKind::Gompertz => {
            let (a, b) = (theta[0], theta[1]);
            let g = (-theta[2] * x).exp();
            let e = (-b * g).exp();
            out[0] = e;
            out[1] = -a * g * e;
            out[2] = a * b * x * g * e;
        }
        ModelKind::Richards => {
            let (a, b, c) = (theta[0], theta[1], theta[2]);
            let decay = (-b * x).exp();
            let u = -(-b * x).exp_m1();
            let uc = u.powf(c);
            out[0] = uc;
            out[1] = a * c * u.powf(c - 1.0) * x * decay;
            out[2] = a * uc * u.ln();
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theta_for(model: ModelKind) -> Vec<f64> {
        match model {
            ModelKind::Exponential => vec![2.0, 0.15],
            ModelKind::Logistic => vec![1000.0, 10.0, 3.0],
            ModelKind::Gompertz => vec![1000.0, 6.0, 0.1],
            ModelKind::Richards => vec![1000.0, 0.1, 3.0],
        }
    }

    #[test]
    fn closed_forms_match_definitions() {
        let x = 4.0_f64;
        let exp = evaluate(ModelKind::Exponential, &[2.0, 0.15], x);
        assert!((exp - 2.0 * (0.6_f64).exp()).abs() < 1e-12);

        let logis = evaluate(ModelKind::Logistic, &[1000.0, 10.0, 3.0], x);
        assert!((logis - 1000.0 / (1.0 + (2.0_f64).exp())).abs() < 1e-9);

        let gomp = evaluate(ModelKind::Gompertz, &[1000.0, 6.0, 0.1], x);
        assert!((gomp - 1000.0 * (-6.0 * (-0.4_f64).exp()).exp()).abs() < 1e-9);

        let rich = evaluate(ModelKind::Richards, &[1000.0, 0.1, 3.0], x);
        assert!((rich - 1000.0 * (1.0 - (-0.4_f64).exp()).powi(3)).abs() < 1e-9);
    }

    #[test]
    fn jacobian_matches_central_differences() {
        for model in ModelKind::ALL {
            let theta = theta_for(model);
            let p = model.param_count();
            for &x in &[1.0, 5.0, 12.0, 25.0] {
                let mut row = vec![0.0; p];
                jacobian_row(model, &theta, x, &mut row);
                for j in 0..p {
                    let h = 1e-6 * theta[j].abs().max(1.0);
                    let mut up = theta.clone();
                    let mut dn = theta.clone();
                    up[j] += h;
                    dn[j] -= h;
                    let fd = (evaluate(model, &up, x) - evaluate(model, &dn, x)) / (2.0 * h);
                    let tol = 1e-5 * fd.abs().max(1.0);
                    assert!(
                        (row[j] - fd).abs() < tol,
                        "{model} d/dθ{j} at x={x}: analytic={} fd={fd}",
                        row[j]
                    );
                }
            }
        }
    }

    #[test]
    fn logistic_is_monotone_for_positive_asymptote() {
        let theta = [500.0, 15.0, 2.5];
        let mut prev = evaluate(ModelKind::Logistic, &theta, 0.0);
        for i in 1..=400 {
            let x = i as f64 * 0.25;
            let y = evaluate(ModelKind::Logistic, &theta, x);
            assert!(y >= prev, "logistic decreased at x={x}");
            assert!(y <= theta[0]);
            prev = y;
        }
    }

    #[test]
    fn logistic_tails_stay_finite() {
        let theta = [1000.0, 10.0, 0.01];
        assert_eq!(evaluate(ModelKind::Logistic, &theta, 1e6), 1000.0);
        assert_eq!(evaluate(ModelKind::Logistic, &theta, -1e6), 0.0);
    }
}
