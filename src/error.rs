use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::ModelKind;
use crate::fit::FittedModel;

/// CLI-level failure: a message plus the process exit code it maps to.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        AppError::new(2, format!("Invalid series: {err}"))
    }
}

/// Violations of the cumulative-series invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series is empty")]
    Empty,

    #[error("non-finite or negative count {value} on {date}")]
    InvalidCount { date: NaiveDate, value: f64 },

    #[error("expected {expected} after {previous}, found {found} (one record per calendar day)")]
    NotConsecutive {
        previous: NaiveDate,
        expected: NaiveDate,
        found: NaiveDate,
    },

    #[error("cumulative count decreases on {date}: {previous} -> {value}")]
    Decreasing {
        date: NaiveDate,
        previous: f64,
        value: f64,
    },
}

/// Modeling failures. None of these abort a run: the pipeline records them
/// next to the model (or replicate) they belong to and carries on.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("{model}: start values undefined ({reason})")]
    StartValueUndefined { model: ModelKind, reason: String },

    #[error("{model}: no convergence after {iterations} iterations (rss={:.6e})", .best.rss)]
    FitNonConvergent {
        model: ModelKind,
        iterations: usize,
        best: Box<FittedModel>,
    },

    #[error("{model}: AICc undefined for n={n}, df={df} (needs n > df + 1)")]
    AiccUndefined { model: ModelKind, n: usize, df: usize },

    #[error("{model}: bootstrap achieved {achieved} of {requested} replicates")]
    BootstrapUnderreplicated {
        model: ModelKind,
        achieved: usize,
        requested: usize,
    },

    #[error("{model}: insufficient data, need at least {required} points, got {actual}")]
    InsufficientData {
        model: ModelKind,
        required: usize,
        actual: usize,
    },

    #[error("{model}: invalid start ({reason})")]
    InvalidStart { model: ModelKind, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ModelError {
    /// Short machine-friendly tag for tables and exports.
    pub fn kind_label(&self) -> &'static str {
        match self {
            ModelError::StartValueUndefined { .. } => "start_value_undefined",
            ModelError::FitNonConvergent { .. } => "fit_non_convergent",
            ModelError::AiccUndefined { .. } => "aicc_undefined",
            ModelError::BootstrapUnderreplicated { .. } => "bootstrap_underreplicated",
            ModelError::InsufficientData { .. } => "insufficient_data",
            ModelError::InvalidStart { .. } => "invalid_start",
            ModelError::InvalidConfig(_) => "invalid_config",
        }
    }

    /// The best (non-converged) fit, when the failure carries one.
    pub fn best_fit(&self) -> Option<&FittedModel> {
        match self {
            ModelError::FitNonConvergent { best, .. } => Some(best.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aicc_undefined_message_names_sizes() {
        let err = ModelError::AiccUndefined {
            model: ModelKind::Richards,
            n: 5,
            df: 4,
        };
        assert_eq!(
            err.to_string(),
            "Richards: AICc undefined for n=5, df=4 (needs n > df + 1)"
        );
        assert_eq!(err.kind_label(), "aicc_undefined");
        assert!(err.best_fit().is_none());
    }

    #[test]
    fn series_error_converts_to_input_exit_code() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let app: AppError = SeriesError::InvalidCount { date, value: -1.0 }.into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("2020-03-01"));
    }
}
