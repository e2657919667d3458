//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - prediction CSV export (`export`)
//! - whole-run JSON export (`run_json`)

pub mod export;
pub mod ingest;
pub mod run_json;

pub use export::*;
pub use ingest::*;
pub use run_json::*;
