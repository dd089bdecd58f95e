mod common;

use aqlhr_insights::source::{procedures, tables, MemoryDataSource};
use aqlhr_insights::trends::{
    AlertSeverity, Metric, TrendError, TrendSeriesLoader, DEFAULT_BACKFILL_DAYS,
};
use common::{as_of, clock, resolver, snapshot_rows, TENANT};
use serde_json::json;
use std::sync::Arc;

fn loader(source: &MemoryDataSource) -> TrendSeriesLoader {
    TrendSeriesLoader::new(Arc::new(source.clone()), resolver(), clock(), 30)
}

#[test]
fn loads_window_in_date_order_with_alerts() {
    let source = MemoryDataSource::new();
    let today = as_of().date_naive();
    let mut rows = snapshot_rows(today, &[60.0; 45], 1800.0);
    rows.reverse();
    source.insert_rows(tables::KPI_SNAPSHOTS, rows);
    source.insert_rows(
        tables::DASHBOARD_ALERTS,
        vec![json!({
            "id": "al-1",
            "company_id": TENANT,
            "title": "Compliance score dropped",
            "message": "Compliance fell below 92",
            "severity": "High",
            "metric": "compliance_score",
            "current_value": 91.0,
            "threshold_value": 92.0,
            "created_at": "2025-06-14T08:00:00Z",
        })],
    );

    let snapshot = loader(&source).refresh().expect("refresh succeeds");
    assert_eq!(snapshot.series.len(), 31, "30-day window is inclusive of both ends");
    let dates: Vec<_> = snapshot
        .series
        .points()
        .iter()
        .map(|point| point.snapshot_date)
        .collect();
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(snapshot.alerts.len(), 1);
    assert_eq!(snapshot.alerts[0].severity, AlertSeverity::High);
}

#[test]
fn month_over_month_compares_the_last_two_points() {
    let source = MemoryDataSource::new();
    source.insert_rows(
        tables::KPI_SNAPSHOTS,
        snapshot_rows(as_of().date_naive(), &[64.0, 66.0, 60.0], 1800.0),
    );
    let loader = loader(&source);
    loader.refresh().expect("refresh succeeds");

    let change = loader
        .month_over_month_change(Metric::LocalizationRate)
        .expect("two points present");
    assert_eq!(change.formatted, "-9.1%");
    assert!(!change.is_positive);

    let flat = loader
        .month_over_month_change(Metric::TotalEmployees)
        .expect("two points present");
    assert_eq!(flat.formatted, "+0.0%");
}

#[test]
fn sparkline_yields_one_point_per_snapshot() {
    let source = MemoryDataSource::new();
    let mut rows = snapshot_rows(as_of().date_naive(), &[61.0, 62.0], 1800.0);
    rows[0]["saudization_rate"] = json!("not-a-number");
    source.insert_rows(tables::KPI_SNAPSHOTS, rows);
    let loader = loader(&source);
    let snapshot = loader.refresh().expect("refresh succeeds");

    let values: Vec<f64> = snapshot
        .sparkline(Metric::LocalizationRate)
        .iter()
        .map(|point| point.value)
        .collect();
    assert_eq!(values, vec![0.0, 62.0]);
    assert!(loader.month_over_month_change(Metric::LocalizationRate).is_none());
}

#[test]
fn fetch_failure_keeps_previous_series() {
    let source = MemoryDataSource::new();
    source.insert_rows(
        tables::KPI_SNAPSHOTS,
        snapshot_rows(as_of().date_naive(), &[60.0, 61.0], 1800.0),
    );
    let loader = loader(&source);
    loader.refresh().expect("first refresh succeeds");

    source.fail(tables::KPI_SNAPSHOTS, "connection reset");
    match loader.refresh() {
        Err(TrendError::Source(err)) => assert!(err.to_string().contains("connection reset")),
        other => panic!("expected source error, got {other:?}"),
    }

    let state = loader.state();
    assert!(!state.loading);
    assert_eq!(state.data.series.len(), 2);
    assert!(state.error.is_some());
}

#[test]
fn backfill_runs_procedure_then_reloads() {
    let source = MemoryDataSource::new();
    let backend = source.clone();
    source.register_procedure(procedures::BACKFILL_KPIS, move |params| {
        assert_eq!(params["p_tenant"], json!(TENANT));
        let days = params["p_days"].as_u64().unwrap_or(0) as usize;
        backend.insert_rows(
            tables::KPI_SNAPSHOTS,
            snapshot_rows(as_of().date_naive(), &vec![63.0; days], 1800.0),
        );
        Ok(json!(days))
    });

    let loader = loader(&source);
    assert!(loader.refresh().expect("empty refresh").series.is_empty());

    let snapshot = loader
        .backfill_historical_data(DEFAULT_BACKFILL_DAYS)
        .expect("backfill succeeds");
    assert_eq!(snapshot.series.len(), 31);
    let calls = source.calls();
    let backfill_at = calls
        .iter()
        .position(|call| call == procedures::BACKFILL_KPIS)
        .expect("backfill called");
    assert_eq!(calls[backfill_at + 1], tables::KPI_SNAPSHOTS);
}

#[test]
fn backfill_propagates_reload_failure() {
    let source = MemoryDataSource::new();
    source.register_procedure(procedures::BACKFILL_KPIS, |_| Ok(json!(0)));
    source.fail(tables::DASHBOARD_ALERTS, "relation does not exist");

    match loader(&source).backfill_historical_data(30) {
        Err(TrendError::Source(err)) => assert!(err.to_string().contains("relation does not exist")),
        other => panic!("expected reload failure, got {other:?}"),
    }
}

#[test]
fn failed_backfill_call_is_recorded_on_state() {
    let source = MemoryDataSource::new();
    source.insert_rows(
        tables::KPI_SNAPSHOTS,
        snapshot_rows(as_of().date_naive(), &[60.0, 61.0], 1800.0),
    );
    let loader = loader(&source);
    loader.refresh().expect("initial refresh succeeds");

    source.fail(procedures::BACKFILL_KPIS, "permission denied for function");
    match loader.backfill_historical_data(DEFAULT_BACKFILL_DAYS) {
        Err(TrendError::Source(err)) => assert!(err.to_string().contains("permission denied")),
        other => panic!("expected backfill failure, got {other:?}"),
    }

    let state = loader.state();
    assert!(!state.loading);
    assert_eq!(state.data.series.len(), 2);
    assert!(state
        .error
        .as_deref()
        .is_some_and(|message| message.contains("permission denied")));
}
