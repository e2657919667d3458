//! Export prediction rows to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! one row per (model, day), interval columns left empty where no bound exists.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::AppError;
use crate::report::Prediction;

/// Write prediction rows to a CSV file.
pub fn write_predictions_csv(path: &Path, predictions: &[Prediction]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_predictions(&mut out, predictions)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Write prediction rows to any writer.
pub fn write_predictions<W: Write>(out: &mut W, predictions: &[Prediction]) -> Result<(), AppError> {
    writeln!(out, "model,x,date,fit,lwr,upr")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for p in predictions {
        writeln!(
            out,
            "{},{},{},{:.4},{},{}",
            p.model.display_name().to_lowercase(),
            p.x,
            p.date.map(|d| d.to_string()).unwrap_or_default(),
            p.fit,
            fmt_bound(p.lwr),
            fmt_bound(p.upr),
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

fn fmt_bound(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.4}")).unwrap_or_default()
}
