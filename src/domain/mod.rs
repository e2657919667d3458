//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the growth-model catalog (`ModelKind`)
//! - the validated input series (`TimeSeries`)
//! - the run configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
