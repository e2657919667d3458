//! Model comparison using information criteria.
//!
//! For each converged fit we compute:
//! - Gaussian log-likelihood `−n/2·(ln 2π + ln(RSS/n) + 1)`
//! - `df = p + 1` (curve parameters plus the residual variance)
//! - AIC, AICc (small-sample correction), BIC
//! - R² as the squared correlation of observed and fitted values
//!
//! Selection rules:
//! 1. Each criterion picks its own argmin; ties go to the earlier candidate.
//! 2. There is no single winner. Every row reports which criteria it won and
//!    how many (0–3), and the caller decides how to present that.
//! 3. AICc is undefined for `n ≤ df + 1`; such rows cannot win AICc.

use serde::Serialize;

use crate::domain::ModelKind;
use crate::error::ModelError;
use crate::fit::fitter::FittedModel;
use crate::math::correlation;

/// Information criteria and goodness of fit for one fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionScore {
    pub model: ModelKind,
    pub n: usize,
    pub df: usize,
    pub loglik: f64,
    pub r_squared: f64,
    pub aic: f64,
    /// `None` when `n ≤ df + 1`.
    pub aicc: Option<f64>,
    pub bic: f64,
}

impl SelectionScore {
    /// The reason AICc is missing, if it is.
    pub fn aicc_issue(&self) -> Option<ModelError> {
        self.aicc.is_none().then_some(ModelError::AiccUndefined {
            model: self.model,
            n: self.n,
            df: self.df,
        })
    }
}

/// One row of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub score: SelectionScore,
    pub best_aic: bool,
    pub best_aicc: bool,
    pub best_bic: bool,
}

impl ComparisonRow {
    /// Number of criteria (out of AIC, AICc, BIC) this model minimizes.
    pub fn wins(&self) -> usize {
        [self.best_aic, self.best_aicc, self.best_bic]
            .iter()
            .filter(|&&w| w)
            .count()
    }
}

/// Comparison across all scored models, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelComparison {
    pub rows: Vec<ComparisonRow>,
}

impl ModelComparison {
    pub fn row(&self, model: ModelKind) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.score.model == model)
    }
}

/// Gaussian log-likelihood at the ML variance estimate `RSS/n`.
///
/// An exact fit would send `ln(RSS/n)` to `−∞`; the variance is floored at the
/// smallest positive `f64` so the value stays finite.
pub fn gaussian_loglik(n: usize, rss: f64) -> f64 {
    let n_f = n as f64;
    let sigma2 = (rss / n_f).max(f64::MIN_POSITIVE);
    -0.5 * n_f * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0)
}

pub fn aic(loglik: f64, df: usize) -> f64 {
    -2.0 * loglik + 2.0 * df as f64
}

/// Small-sample corrected AIC; `None` when `n ≤ df + 1`.
pub fn aicc(loglik: f64, df: usize, n: usize) -> Option<f64> {
    if n <= df + 1 {
        return None;
    }
    let k = df as f64;
    Some(aic(loglik, df) + 2.0 * k * (k + 1.0) / (n as f64 - k - 1.0))
}

pub fn bic(loglik: f64, df: usize, n: usize) -> f64 {
    -2.0 * loglik + (n as f64).ln() * df as f64
}

/// Score a fitted model against the observations it was fitted to.
pub fn score(fitted: &FittedModel, y: &[f64]) -> SelectionScore {
    let n = fitted.n;
    let df = fitted.df();
    let loglik = fitted.loglik;
    let r_squared = correlation(y, &fitted.fitted)
        .map(|r| r * r)
        .unwrap_or(0.0);

    SelectionScore {
        model: fitted.model,
        n,
        df,
        loglik,
        r_squared,
        aic: aic(loglik, df),
        aicc: aicc(loglik, df, n),
        bic: bic(loglik, df, n),
    }
}

/// Mark the argmin of each criterion independently.
pub fn compare(scores: &[SelectionScore]) -> ModelComparison {
    let best_aic = argmin(scores.iter().map(|s| Some(s.aic)));
    let best_aicc = argmin(scores.iter().map(|s| s.aicc));
    let best_bic = argmin(scores.iter().map(|s| Some(s.bic)));

    let rows = scores
        .iter()
        .enumerate()
        .map(|(i, s)| ComparisonRow {
            score: s.clone(),
            best_aic: best_aic == Some(i),
            best_aicc: best_aicc == Some(i),
            best_bic: best_bic == Some(i),
        })
        .collect();

    ModelComparison { rows }
}

/// Index of the smallest finite value; the earliest wins ties.
fn argmin(values: impl Iterator<Item = Option<f64>>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        let Some(v) = v.filter(|v| v.is_finite()) else {
            continue;
        };
        if best.is_none_or(|(_, b)| v < b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fitter::{FitOptions, fit};
    use crate::models::{StartOptions, evaluate_all, start_values};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn score_row(model: ModelKind, aic: f64, aicc: Option<f64>, bic: f64) -> SelectionScore {
        SelectionScore {
            model,
            n: 30,
            df: 4,
            loglik: 0.0,
            r_squared: 0.9,
            aic,
            aicc,
            bic,
        }
    }

    #[test]
    fn loglik_matches_closed_form() {
        let ll = gaussian_loglik(10, 20.0);
        let expected = -5.0 * ((2.0 * std::f64::consts::PI).ln() + 2.0_f64.ln() + 1.0);
        assert!((ll - expected).abs() < 1e-12);
        assert!(gaussian_loglik(10, 0.0).is_finite());
    }

    #[test]
    fn aicc_dominates_aic_and_converges() {
        let df = 4;
        let ll = -50.0;
        let mut prev_gap = f64::INFINITY;
        for n in [6, 8, 12, 30, 100, 1_000, 100_000] {
            let a = aic(ll, df);
            let c = aicc(ll, df, n).unwrap();
            assert!(c >= a);
            let gap = c - a;
            assert!(gap < prev_gap);
            prev_gap = gap;
        }
        assert!(prev_gap < 1e-3);
    }

    #[test]
    fn aicc_is_undefined_for_tiny_samples() {
        assert!(aicc(-1.0, 4, 5).is_none());
        assert!(aicc(-1.0, 4, 6).is_some());

        let s = score_row(ModelKind::Richards, 1.0, None, 2.0);
        assert!(matches!(
            s.aicc_issue(),
            Some(ModelError::AiccUndefined { n: 30, df: 4, .. })
        ));
    }

    #[test]
    fn criteria_are_won_independently() {
        let scores = vec![
            score_row(ModelKind::Logistic, 10.0, Some(12.0), 20.0),
            score_row(ModelKind::Gompertz, 9.0, Some(13.0), 21.0),
            score_row(ModelKind::Richards, 11.0, None, 19.0),
        ];
        let cmp = compare(&scores);
        let logis = cmp.row(ModelKind::Logistic).unwrap();
        let gomp = cmp.row(ModelKind::Gompertz).unwrap();
        let rich = cmp.row(ModelKind::Richards).unwrap();

        assert!(logis.best_aicc && !logis.best_aic && !logis.best_bic);
        assert!(gomp.best_aic);
        assert!(rich.best_bic && !rich.best_aicc);
        assert_eq!(logis.wins() + gomp.wins() + rich.wins(), 3);
    }

    #[test]
    fn ties_go_to_the_earlier_model() {
        let scores = vec![
            score_row(ModelKind::Logistic, 5.0, Some(5.0), 5.0),
            score_row(ModelKind::Gompertz, 5.0, Some(5.0), 5.0),
        ];
        let cmp = compare(&scores);
        assert_eq!(cmp.rows[0].wins(), 3);
        assert_eq!(cmp.rows[1].wins(), 0);
    }

    #[test]
    fn noisy_logistic_prefers_logistic_over_exponential() {
        let x: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let truth = evaluate_all(ModelKind::Logistic, &[1000.0, 10.0, 3.0], &x);
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 5.0).unwrap();
        let y: Vec<f64> = truth.iter().map(|v| v + noise.sample(&mut rng)).collect();

        let fit_any = |model: ModelKind| {
            let theta0 = start_values(model, &x, &y, &StartOptions::default()).unwrap();
            match fit(model, &x, &y, &theta0, &FitOptions::for_model(model)) {
                Ok(f) => f,
                Err(e) => e.best_fit().cloned().expect("fit produced no parameters"),
            }
        };
        let logis = fit_any(ModelKind::Logistic);
        let expo = fit_any(ModelKind::Exponential);
        assert!(logis.converged);

        let cmp = compare(&[score(&logis, &y), score(&expo, &y)]);
        let row = cmp.row(ModelKind::Logistic).unwrap();
        assert!(row.best_aic && row.best_aicc && row.best_bic);
        assert_eq!(row.wins(), 3);
        assert!(row.score.r_squared > 0.99);
    }
}
