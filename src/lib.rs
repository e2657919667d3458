//! `growth-curves` library crate.
//!
//! The binary (`gc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the pipeline can be driven from other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod bootstrap;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
