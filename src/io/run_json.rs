//! Write a whole run as JSON.
//!
//! The file wraps `RunOutput` (fits, comparison, intervals, tables, warnings)
//! with a small header naming the tool and the input source.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct RunFile<'a> {
    tool: &'static str,
    version: &'static str,
    source: &'a str,
    run: &'a RunOutput,
}

/// Write `run` to `path` as pretty-printed JSON.
pub fn write_run_json(path: &Path, source: &str, run: &RunOutput) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create run JSON '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_run(&mut out, source, run)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush run JSON: {e}")))
}

pub fn write_run<W: Write>(out: &mut W, source: &str, run: &RunOutput) -> Result<(), AppError> {
    let file = RunFile {
        tool: "gc",
        version: env!("CARGO_PKG_VERSION"),
        source,
        run,
    };
    serde_json::to_writer_pretty(out, &file)
        .map_err(|e| AppError::new(2, format!("Failed to write run JSON: {e}")))
}
