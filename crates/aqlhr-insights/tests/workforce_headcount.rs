mod common;

use aqlhr_insights::source::{procedures, tables, MemoryDataSource};
use aqlhr_insights::tenant::{StaticTenantResolver, TenantResolutionError};
use aqlhr_insights::workforce::{EmployeeAggregator, NitaqatBand, WorkforceError, DIRECTORY_LIMIT};
use common::{resolver, workforce_source};
use serde_json::json;
use std::sync::Arc;

#[test]
fn aggregate_procedure_drives_the_summary() {
    let source = workforce_source(10, 6, Some((1848, 1247)));
    let aggregator = EmployeeAggregator::new(Arc::new(source.clone()), resolver());

    let snapshot = aggregator.refresh().expect("refresh succeeds");
    assert_eq!(snapshot.summary.total_active, 1848);
    assert_eq!(snapshot.summary.local_active, 1247);
    assert_eq!(snapshot.summary.non_local_active, 601);
    assert_eq!(snapshot.summary.localization_pct, 67.5);
    assert_eq!(snapshot.summary.band, NitaqatBand::Platinum);
    assert_eq!(source.calls()[0], procedures::HEADCOUNT);

    let state = aggregator.state();
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[test]
fn empty_aggregate_falls_back_to_counting_active_records() {
    let source = workforce_source(4, 1, None);
    source.insert_rows(
        tables::EMPLOYEES,
        vec![json!({
            "id": "emp-gone",
            "company_id": "acme",
            "is_saudi": true,
            "status": "terminated",
        })],
    );
    let aggregator = EmployeeAggregator::new(Arc::new(source), resolver());

    let summary = aggregator.refresh().expect("refresh succeeds").summary;
    assert_eq!(summary.total_active, 4);
    assert_eq!(summary.local_active, 1);
    assert_eq!(summary.localization_pct, 25.0);
}

#[test]
fn directory_is_bounded_and_joined_with_department_names() {
    let source = workforce_source(120, 80, Some((120, 80)));
    let aggregator = EmployeeAggregator::new(Arc::new(source), resolver());

    let directory = aggregator.refresh().expect("refresh succeeds").directory;
    assert_eq!(directory.len(), DIRECTORY_LIMIT);
    assert_eq!(directory[0].full_name, "Employee 0000");
    assert_eq!(directory[0].department_name.as_deref(), Some("Operations"));
    assert_eq!(directory[1].department_name.as_deref(), Some("Human Resources"));
}

#[test]
fn directory_failure_does_not_fail_the_refresh() {
    let source = workforce_source(3, 3, Some((3, 3)));
    source.fail(tables::EMPLOYEES, "permission denied for table hr_employees");
    let aggregator = EmployeeAggregator::new(Arc::new(source), resolver());

    let snapshot = aggregator.refresh().expect("aggregate path still succeeds");
    assert_eq!(snapshot.summary.localization_pct, 100.0);
    assert!(snapshot.directory.is_empty());
}

#[test]
fn aggregate_failure_is_surfaced_on_state() {
    let source = workforce_source(3, 1, Some((3, 1)));
    let aggregator = EmployeeAggregator::new(Arc::new(source.clone()), resolver());
    aggregator.refresh().expect("first refresh succeeds");

    source.fail(procedures::HEADCOUNT, "statement timeout");
    match aggregator.refresh() {
        Err(WorkforceError::Source(err)) => assert!(err.to_string().contains("statement timeout")),
        other => panic!("expected source error, got {other:?}"),
    }

    let state = aggregator.state();
    assert!(!state.loading);
    assert!(state.error.as_deref().is_some_and(|msg| msg.contains("statement timeout")));
    assert_eq!(state.data.summary.total_active, 3, "last good summary is kept");
}

#[test]
fn missing_tenant_is_a_resolution_error() {
    let aggregator = EmployeeAggregator::new(
        Arc::new(MemoryDataSource::new()),
        Arc::new(StaticTenantResolver::default()),
    );
    match aggregator.refresh() {
        Err(WorkforceError::Tenant(TenantResolutionError::Missing)) => {}
        other => panic!("expected missing tenant, got {other:?}"),
    }
}

#[test]
fn empty_workforce_reports_zero_localization() {
    let source = workforce_source(0, 0, None);
    let aggregator = EmployeeAggregator::new(Arc::new(source), resolver());
    let summary = aggregator.refresh().expect("refresh succeeds").summary;
    assert_eq!(summary.total_active, 0);
    assert_eq!(summary.localization_pct, 0.0);
}
