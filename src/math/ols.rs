//! Least squares solvers.
//!
//! Two shapes of problem show up in this project:
//!
//! ```text
//! minimize ||A δ - b||^2        (damped Gauss–Newton steps, small dense A)
//! minimize Σ (y_i - a - b x_i)^2 (log-linear start-value regressions)
//! ```
//!
//! Implementation choices:
//! - The dense problem goes through SVD so tall or nearly rank-deficient
//!   Jacobians still produce a usable step.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - The simple regression is closed form; it only needs the two moments.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(delta) = svd.solve(b, tol) {
            if delta.iter().all(|v| v.is_finite()) {
                return Some(delta);
            }
        }
    }

    None
}

/// Straight-line fit `y ≈ intercept + slope·x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
}

/// Ordinary least squares of `y` on `x`.
///
/// Returns `None` for fewer than two points, mismatched lengths, non-finite
/// input, or zero spread in `x`.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LineFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let n = x.len() as f64;
    let xbar = x.iter().sum::<f64>() / n;
    let ybar = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - xbar;
        sxy += dx * (yi - ybar);
        sxx += dx * dx;
    }
    if sxx <= 1e-18 {
        return None;
    }

    let slope = sxy / sxx;
    Some(LineFit {
        intercept: ybar - slope * xbar,
        slope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let delta = solve_least_squares(&a, &b).unwrap();
        assert!((delta[0] - 2.0).abs() < 1e-10);
        assert!((delta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_exact_line() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| -1.5 + 0.25 * v).collect();
        let line = fit_line(&x, &y).unwrap();
        assert!((line.intercept + 1.5).abs() < 1e-12);
        assert!((line.slope - 0.25).abs() < 1e-12);
    }

    #[test]
    fn fit_line_rejects_degenerate_input() {
        assert!(fit_line(&[1.0], &[2.0]).is_none());
        assert!(fit_line(&[2.0, 2.0], &[1.0, 3.0]).is_none());
        assert!(fit_line(&[1.0, 2.0], &[f64::NAN, 3.0]).is_none());
    }
}
