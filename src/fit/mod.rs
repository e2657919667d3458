//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one model by Levenberg–Marquardt from a start value
//! - score fitted models with information criteria
//! - compare models criterion by criterion

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
