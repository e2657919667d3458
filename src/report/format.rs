//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::fit::FittedModel;
use crate::report::NextDayRow;

/// Format the full run summary: series stats, fits, comparison, failures.
pub fn format_run_summary(run: &RunOutput, source: &str) -> String {
    let mut out = String::new();

    out.push_str("=== gc - Growth Curve Fit ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Series: n={} | {} .. {} | y=[{:.1}, {:.1}]\n",
        run.stats.n, run.stats.start_date, run.stats.end_date, run.stats.y_min, run.stats.y_max
    ));

    out.push_str("\nFitted models:\n");
    for fit in &run.fits {
        out.push_str(&format!(
            "  {:<12} RSS={:.3} sigma^2={:.3} iter={:<4} theta: {}\n",
            fit.model.display_name(),
            fit.rss,
            fit.residual_variance,
            fit.iterations,
            fmt_theta(fit)
        ));
    }
    for failure in &run.failures {
        out.push_str(&format!(
            "  (failed {}) [{}] {}\n",
            failure.model.display_name(),
            failure.kind,
            failure.reason
        ));
    }

    if !run.comparison.rows.is_empty() {
        out.push_str("\nModel comparison (* = best on that criterion):\n");
        out.push_str(&header_line(&[
            ("model", 12, Align::Left),
            ("df", 3, Align::Right),
            ("loglik", 12, Align::Right),
            ("R2", 8, Align::Right),
            ("AIC", 13, Align::Right),
            ("AICc", 13, Align::Right),
            ("BIC", 13, Align::Right),
            ("wins", 4, Align::Right),
        ]));
        for row in &run.comparison.rows {
            let s = &row.score;
            out.push_str(
                format!(
                    "{:<12} {:>3} {:>12.3} {:>8.5} {:>13} {:>13} {:>13} {:>4}\n",
                    s.model.display_name(),
                    s.df,
                    s.loglik,
                    s.r_squared,
                    mark(Some(s.aic), row.best_aic),
                    mark(s.aicc, row.best_aicc),
                    mark(Some(s.bic), row.best_bic),
                    row.wins()
                )
                .trim_end(),
            );
            out.push('\n');
        }
    }

    if !run.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &run.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    out
}

/// Format the next-day table and the per-day forecast table for the horizon.
pub fn format_forecasts(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("Next day:\n");
    out.push_str(&format_next_day(&run.next_day));

    let last = run.stats.n as f64;
    let future: Vec<_> = run.forecast_table.iter().filter(|r| r.x > last).collect();
    if future.is_empty() || run.fits.is_empty() {
        return out;
    }

    out.push_str("\nForecast (point fit per model):\n");
    let mut head = format!("{:<10} {:>5}", "date", "x");
    for fit in &run.fits {
        head.push_str(&format!(" {:>12}", fit.model.display_name()));
    }
    out.push_str(head.trim_end());
    out.push('\n');

    for row in future {
        let mut line = format!(
            "{:<10} {:>5}",
            row.date.map(|d| d.to_string()).unwrap_or_default(),
            row.x
        );
        for (_, v) in &row.values {
            line.push_str(&format!(" {v:>12.1}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if !run.intervals.is_empty() {
        out.push_str("\nBootstrap:\n");
        for iv in &run.intervals {
            out.push_str(&format!(
                "  {:<12} level={:.2} block={} draws={}/{} (failed {}, cancelled {})\n",
                iv.model.display_name(),
                iv.level,
                iv.block_length,
                iv.achieved,
                iv.requested,
                iv.failed,
                iv.cancelled
            ));
        }
    }

    out
}

fn format_next_day(rows: &[NextDayRow]) -> String {
    let mut out = header_line(&[
        ("model", 12, Align::Left),
        ("date", 10, Align::Left),
        ("fit", 12, Align::Right),
        ("lower", 12, Align::Right),
        ("upper", 12, Align::Right),
    ]);
    for r in rows {
        out.push_str(
            format!(
                "{:<12} {:<10} {:>12.1} {:>12} {:>12}\n",
                r.model.display_name(),
                r.date.map(|d| d.to_string()).unwrap_or_default(),
                r.fit,
                fmt_opt(r.lwr),
                fmt_opt(r.upr)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

/// Column titles plus a dashed underline.
fn header_line(cols: &[(&str, usize, Align)]) -> String {
    let titles: Vec<String> = cols
        .iter()
        .map(|&(name, width, align)| match align {
            Align::Left => format!("{name:<width$}"),
            Align::Right => format!("{name:>width$}"),
        })
        .collect();
    let dashes: Vec<String> = cols.iter().map(|&(_, width, _)| "-".repeat(width)).collect();

    let mut out = titles.join(" ").trim_end().to_string();
    out.push('\n');
    out.push_str(&dashes.join(" "));
    out.push('\n');
    out
}

fn mark(v: Option<f64>, best: bool) -> String {
    match v {
        Some(v) if best => format!("{v:.3}*"),
        Some(v) => format!("{v:.3} "),
        None => "n/a ".to_string(),
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

fn fmt_theta(fit: &FittedModel) -> String {
    let parts: Vec<String> = fit
        .model
        .param_names()
        .iter()
        .zip(&fit.theta)
        .map(|(name, v)| format!("{name}={v:.6}"))
        .collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_has_matching_underline() {
        let h = header_line(&[("model", 6, Align::Left), ("fit", 5, Align::Right)]);
        let lines: Vec<&str> = h.lines().collect();
        assert_eq!(lines[0], "model    fit");
        assert_eq!(lines[1], "------ -----");
    }

    #[test]
    fn marks_best_and_missing_values() {
        assert_eq!(mark(Some(1.5), true), "1.500*");
        assert_eq!(mark(Some(1.5), false), "1.500 ");
        assert_eq!(mark(None, false), "n/a ");
        assert_eq!(fmt_opt(None), "-");
    }
}
