#![allow(dead_code)]

use aqlhr_insights::clock::{Clock, FixedClock};
use aqlhr_insights::insights::{
    EngineSettings, ExternalFactorProbes, InsightAgent, InsightEngine, ScoringStrategy,
};
use aqlhr_insights::source::{procedures, tables, MemoryDataSource};
use aqlhr_insights::tenant::{StaticTenantResolver, TenantId, TenantResolver};
use aqlhr_insights::trends::TrendSeriesLoader;
use aqlhr_insights::workforce::EmployeeAggregator;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

pub const TENANT: &str = "acme";

pub fn tenant() -> TenantId {
    TenantId::parse(TENANT).expect("valid tenant")
}

pub fn resolver() -> Arc<dyn TenantResolver> {
    Arc::new(StaticTenantResolver::tenant(tenant()))
}

/// Mid-June: outside the cultural period, summer season.
pub fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0)
        .single()
        .expect("valid instant")
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(as_of()))
}

pub fn employee_rows(total: u32, local: u32) -> Vec<Value> {
    (0..total)
        .map(|i| {
            json!({
                "id": format!("emp-{i:04}"),
                "company_id": TENANT,
                "first_name": "Employee",
                "last_name": format!("{i:04}"),
                "is_saudi": i < local,
                "status": "active",
                "department_id": if i % 2 == 0 { "dep-ops" } else { "dep-hr" },
            })
        })
        .collect()
}

pub fn department_rows() -> Vec<Value> {
    vec![
        json!({ "id": "dep-ops", "company_id": TENANT, "name": "Operations" }),
        json!({ "id": "dep-hr", "company_id": TENANT, "name": "Human Resources" }),
    ]
}

/// Daily snapshots ending on `end`, one per entry in `rates`.
pub fn snapshot_rows(end: NaiveDate, rates: &[f64], headcount: f64) -> Vec<Value> {
    let len = rates.len() as u64;
    rates
        .iter()
        .enumerate()
        .map(|(i, rate)| {
            let date = end - Days::new(len - 1 - i as u64);
            json!({
                "company_id": TENANT,
                "snap_date": date.to_string(),
                "total_employees": headcount,
                "saudization_rate": rate,
                "hse_safety_score": 88.0,
                "compliance_score": 91.0,
                "employee_experience_10": 7.4,
                "predictive_risk_high": 12,
            })
        })
        .collect()
}

/// Backend with a workforce, where the headcount procedure answers with
/// the given aggregate (`None` forces the record-counting fallback).
pub fn workforce_source(total: u32, local: u32, aggregate: Option<(u32, u32)>) -> MemoryDataSource {
    let source = MemoryDataSource::new();
    source.insert_rows(tables::EMPLOYEES, employee_rows(total, local));
    source.insert_rows(tables::DEPARTMENTS, department_rows());
    source.register_procedure(procedures::HEADCOUNT, move |_| {
        Ok(match aggregate {
            Some((total, saudi)) => json!([{
                "total": total,
                "saudi": saudi,
                "non_saudi": total - saudi,
            }]),
            None => Value::Null,
        })
    });
    source
}

pub fn agent_with(
    source: MemoryDataSource,
    tenants: Arc<dyn TenantResolver>,
    clock: Arc<dyn Clock>,
) -> InsightAgent {
    let source = Arc::new(source);
    let workforce = Arc::new(EmployeeAggregator::new(source.clone(), tenants.clone()));
    let trends = Arc::new(TrendSeriesLoader::new(source, tenants, clock.clone(), 30));
    InsightAgent::new(
        workforce,
        trends,
        ExternalFactorProbes::default(),
        InsightEngine::new(EngineSettings::default(), ScoringStrategy::RuleBased),
        clock,
    )
}
