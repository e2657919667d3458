use chrono::NaiveDate;

use growth_curves::app::pipeline::run_pipeline;
use growth_curves::bootstrap::{BlockLength, BootstrapConfig};
use growth_curves::data::{SampleSpec, simulate_series};
use growth_curves::domain::{ModelKind, PipelineConfig, TimeSeries};
use growth_curves::io::{CsvSpec, read_series, write_predictions};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
}

fn demo_series() -> TimeSeries {
    let spec = SampleSpec::demo(ModelKind::Logistic, 30, 5.0, 42, start());
    simulate_series(&spec).unwrap()
}

fn config(replicates: usize) -> PipelineConfig {
    PipelineConfig {
        horizon: 7,
        bootstrap: BootstrapConfig {
            block_length: BlockLength::Fixed(3),
            replicates,
            seed: 11,
            ..BootstrapConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn full_run_produces_tables_for_every_fitted_model() {
    let series = demo_series();
    let out = run_pipeline(&series, &config(100), None).unwrap();

    assert_eq!(out.fits.len() + out.failures.len(), 4);
    let logistic = out.fit_for(ModelKind::Logistic).expect("logistic fits its own data");
    assert!(logistic.converged);

    // One prediction row per (model, day) across history and horizon.
    assert_eq!(out.predictions.len(), out.fits.len() * 37);
    assert_eq!(out.forecast_table.len(), 37);
    assert_eq!(out.next_day.len(), out.fits.len());
    assert_eq!(out.comparison.rows.len(), out.fits.len());

    let intervals = out
        .intervals
        .iter()
        .find(|iv| iv.model == ModelKind::Logistic)
        .expect("logistic bootstrap");
    assert_eq!(intervals.bounds.len(), 7);
    assert_eq!(intervals.block_length, 3);
    for b in &intervals.bounds {
        assert!(b.x > 30.0);
        assert!(b.lwr <= b.upr);
    }

    let next = out
        .next_day
        .iter()
        .find(|r| r.model == ModelKind::Logistic)
        .unwrap();
    assert_eq!(next.x, 31.0);
    assert_eq!(next.date, NaiveDate::from_ymd_opt(2020, 3, 31));
    assert!(next.lwr.is_some() && next.upr.is_some());

    // History rows never carry bounds.
    assert!(
        out.predictions
            .iter()
            .filter(|p| p.x <= 30.0)
            .all(|p| p.lwr.is_none() && p.upr.is_none())
    );
}

#[test]
fn same_seed_same_intervals() {
    let series = demo_series();
    let cfg = PipelineConfig {
        models: vec![ModelKind::Logistic, ModelKind::Exponential],
        ..config(120)
    };
    let a = run_pipeline(&series, &cfg, None).unwrap();
    let b = run_pipeline(&series, &cfg, None).unwrap();
    assert_eq!(a.intervals, b.intervals);
    assert_eq!(a.predictions, b.predictions);
}

#[test]
fn csv_to_export_round_trip() {
    let series = demo_series();
    let mut csv = String::from("date,count\n");
    for (date, y) in series.dates().iter().zip(series.y()) {
        csv.push_str(&format!("{date},{y}\n"));
    }

    let ingested = read_series(csv.as_bytes(), &CsvSpec::default()).unwrap();
    assert_eq!(ingested.series.y(), series.y());

    let cfg = PipelineConfig {
        models: vec![ModelKind::Logistic],
        horizon: 3,
        ..config(50)
    };
    let out = run_pipeline(&ingested.series, &cfg, None).unwrap();

    let mut buf = Vec::new();
    write_predictions(&mut buf, &out.predictions).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1 + 33);
    assert!(lines[33].starts_with("logistic,33,2020-04-02,"));
}
