use crate::infra::{session_resolver, Services};
use aqlhr_insights::cci::{
    Artifact, ChartSet, ExportFormat, ExportRequest, ExportScope, Initiative, Language,
};
use aqlhr_insights::clock::{Clock, SystemClock};
use aqlhr_insights::config::AppConfig;
use aqlhr_insights::error::AppError;
use aqlhr_insights::insights::AnalysisBatch;
use aqlhr_insights::source::{procedures, tables, MemoryDataSource};
use aqlhr_insights::tenant::{require_tenant, TenantId};
use chrono::{Days, NaiveDate};
use clap::Args;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) const DEMO_TOTAL_EMPLOYEES: u32 = 1848;
pub(crate) const DEMO_LOCAL_EMPLOYEES: u32 = 1247;
pub(crate) const DEMO_HISTORY_DAYS: u64 = 90;
pub(crate) const DEMO_SURVEY_ID: &str = "culture-pulse-2025";
pub(crate) const DEMO_WAVE_ID: &str = "wave-2";

/// Final week of the demo history slides towards the localization floor.
const DEMO_DECLINE: [f64; 5] = [70.0, 69.4, 68.8, 68.1, 67.5];

const DEMO_DEPARTMENTS: [(&str, &str); 4] = [
    ("dep-ops", "Operations"),
    ("dep-hr", "Human Resources"),
    ("dep-fin", "Finance"),
    ("dep-it", "Information Technology"),
];

const DEMO_NAMES: [(&str, &str); 12] = [
    ("Abdullah", "Al-Harbi"),
    ("Fatimah", "Al-Qahtani"),
    ("Mohammed", "Al-Otaibi"),
    ("Noura", "Al-Shehri"),
    ("Khalid", "Al-Ghamdi"),
    ("Sara", "Al-Dossary"),
    ("Rahul", "Menon"),
    ("Maria", "Santos"),
    ("Omar", "Al-Zahrani"),
    ("Huda", "Al-Mutairi"),
    ("Imran", "Qureshi"),
    ("Lina", "Al-Anazi"),
];

/// In-process backend seeded with a mid-sized company: headcount aggregate,
/// a short employee directory, ninety days of KPI snapshots and one culture
/// survey wave.
pub(crate) fn demo_source(tenant: &TenantId, today: NaiveDate) -> MemoryDataSource {
    let source = MemoryDataSource::new();
    let company = tenant.as_str().to_string();

    source.register_procedure(procedures::HEADCOUNT, |_| {
        Ok(json!([{
            "total": DEMO_TOTAL_EMPLOYEES,
            "saudi": DEMO_LOCAL_EMPLOYEES,
            "non_saudi": DEMO_TOTAL_EMPLOYEES - DEMO_LOCAL_EMPLOYEES,
        }]))
    });
    source.insert_rows(
        tables::DEPARTMENTS,
        DEMO_DEPARTMENTS
            .iter()
            .map(|(id, name)| json!({ "id": id, "company_id": company, "name": name })),
    );
    source.insert_rows(tables::EMPLOYEES, employee_rows(&company));
    source.insert_rows(tables::KPI_SNAPSHOTS, snapshot_rows(&company, today));
    source.insert_rows(
        tables::DASHBOARD_ALERTS,
        vec![json!({
            "id": "alert-demo-1",
            "company_id": company,
            "title": "Localization rate trending down",
            "message": "Saudization dropped five days in a row",
            "severity": "High",
            "metric": "saudization_rate",
            "current_value": DEMO_DECLINE[DEMO_DECLINE.len() - 1],
            "threshold_value": 70.0,
            "created_at": format!("{today}T06:00:00Z"),
        })],
    );

    let overview = culture_overview(today);
    source.register_procedure(procedures::CCI_OVERVIEW, move |params| {
        if params["p_wave"] == json!(DEMO_WAVE_ID) {
            Ok(json!([overview.clone()]))
        } else {
            Ok(json!([]))
        }
    });
    source.register_procedure(procedures::SESSION_MEMORY, |_| Ok(Value::Null));
    source
}

fn employee_rows(company: &str) -> Vec<Value> {
    DEMO_NAMES
        .iter()
        .enumerate()
        .map(|(i, (first, last))| {
            let (department, _) = DEMO_DEPARTMENTS[i % DEMO_DEPARTMENTS.len()];
            json!({
                "id": format!("emp-{:03}", i + 1),
                "company_id": company,
                "first_name": first,
                "last_name": last,
                "is_saudi": last.starts_with("Al-"),
                "status": "active",
                "department_id": department,
            })
        })
        .collect()
}

fn snapshot_rows(company: &str, today: NaiveDate) -> Vec<Value> {
    let start = DEMO_HISTORY_DAYS as usize - DEMO_DECLINE.len();
    (0..DEMO_HISTORY_DAYS)
        .filter_map(|offset| {
            let date = today.checked_sub_days(Days::new(DEMO_HISTORY_DAYS - 1 - offset))?;
            let i = offset as usize;
            let rate = if i >= start {
                DEMO_DECLINE[i - start]
            } else {
                72.0 - i as f64 * 0.02
            };
            let wobble = (i % 7) as f64 * 0.1;
            Some(json!({
                "company_id": company,
                "snap_date": date.to_string(),
                "total_employees": DEMO_TOTAL_EMPLOYEES as f64 - (i % 5) as f64,
                "saudization_rate": rate,
                "hse_safety_score": 86.0 + wobble,
                "compliance_score": 91.5 - wobble,
                "employee_experience_10": 7.2 + wobble / 2.0,
                "predictive_risk_high": 14 + (i % 4),
            }))
        })
        .collect()
}

fn culture_overview(today: NaiveDate) -> Value {
    json!({
        "balance_score": 68.4,
        "risk_index": 31.2,
        "psych_safety": 72.9,
        "values_alignment": 0.61,
        "cvf": { "Clan": 32.0, "Adhocracy": 18.5, "Market": 24.0, "Hierarchy": 25.5 },
        "web": {
            "Stories": 3.8,
            "Rituals & Routines": 3.5,
            "Symbols": 3.2,
            "Organizational Structure": 2.9,
            "Control Systems": 3.1,
            "Power Structures": 2.7
        },
        "barrett": { "values_alignment": 0.66, "entropy": 0.17 },
        "n": 214,
        "last_computed_at": format!("{today}T02:00:00Z"),
    })
}

pub(crate) fn demo_initiatives() -> Vec<Initiative> {
    vec![
        Initiative {
            title: "Leadership listening sessions".to_string(),
            owner: Some("CHRO".to_string()),
            priority: "high".to_string(),
        },
        Initiative {
            title: "Recognition rituals refresh".to_string(),
            owner: Some("People Experience".to_string()),
            priority: "medium".to_string(),
        },
        Initiative {
            title: "Decision rights clarity workshop".to_string(),
            owner: None,
            priority: "medium".to_string(),
        },
    ]
}

/// Wires the demo backend behind the demo tenant.
pub(crate) fn demo_services(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Services, AppError> {
    let tenant = TenantId::parse(&config.insights.demo_tenant)?;
    let source = demo_source(&tenant, clock.today());
    Ok(Services::build(
        config,
        Arc::new(source),
        session_resolver(tenant),
        clock,
    ))
}

#[derive(Args, Debug, Default)]
pub(crate) struct AnalyzeArgs {
    /// Print the batch as JSON instead of a readable summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CciExportArgs {
    /// Output format: csv, pdf or pptx
    #[arg(long, default_value = "pdf")]
    pub(crate) format: ExportFormat,
    /// Report language: en or ar
    #[arg(long = "lang", default_value = "en")]
    pub(crate) language: Language,
    /// Destination path (defaults to the generated filename)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let services = demo_services(&config, Arc::new(SystemClock))?;
    let batch = services.agent.run_cycle()?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&batch).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_batch(&batch);
    }
    Ok(())
}

fn render_batch(batch: &AnalysisBatch) {
    println!("AqlHR insight cycle");
    println!("{}", batch.reasoning);
    println!("\nInsights ({})", batch.insights.len());
    for insight in &batch.insights {
        println!(
            "- [{}|{}] {} ({:.0}% confidence)",
            insight.priority.label(),
            insight.insight_type.label(),
            insight.title,
            insight.confidence * 100.0
        );
    }
    println!("\nCross-module connections");
    for connection in &batch.connections {
        println!(
            "- {} -> {} ({}, strength {:.2})",
            connection.from_module,
            connection.to_module,
            connection.relationship_type,
            connection.strength
        );
    }
}

pub(crate) fn run_cci_export(args: CciExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = demo_services(&config, clock.clone())?;
    let request = ExportRequest {
        scope: demo_scope(
            require_tenant(services.tenants.as_ref())?,
            args.as_of.unwrap_or_else(|| clock.today()),
        ),
        format: args.format,
        language: args.language,
        initiatives: demo_initiatives(),
        charts: ChartSet::default(),
    };

    let artifact = services.exporter.export(&request)?;
    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(&artifact.filename));
    std::fs::write(&path, &artifact.bytes)?;
    render_artifact(&artifact, &path);
    Ok(())
}

pub(crate) fn demo_scope(tenant_id: TenantId, as_of: NaiveDate) -> ExportScope {
    ExportScope {
        tenant_id,
        survey_id: DEMO_SURVEY_ID.to_string(),
        wave_id: DEMO_WAVE_ID.to_string(),
        survey_name: "Culture Pulse 2025".to_string(),
        wave_label: "Wave 2".to_string(),
        wave_no: 2,
        as_of,
    }
}

fn render_artifact(artifact: &Artifact, path: &std::path::Path) {
    println!(
        "Wrote {} ({}, {} bytes) to {}",
        artifact.filename,
        artifact.mime,
        artifact.bytes.len(),
        path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqlhr_insights::clock::FixedClock;
    use aqlhr_insights::insights::{InsightPriority, InsightType};
    use chrono::{TimeZone, Utc};

    fn services() -> Services {
        let instant = Utc
            .with_ymd_and_hms(2025, 6, 15, 9, 0, 0)
            .single()
            .expect("valid instant");
        demo_services(&AppConfig::default(), Arc::new(FixedClock::new(instant)))
            .expect("demo services")
    }

    #[test]
    fn demo_cycle_flags_declining_localization() {
        let batch = services().agent.run_cycle().expect("cycle succeeds");
        let alerts = batch.by_type(InsightType::Alert);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].priority, InsightPriority::Critical);
        assert!(batch.reasoning.contains("1848 active, localization 67.5%"));
    }

    #[test]
    fn demo_export_resolves_the_demo_wave() {
        let services = services();
        let tenant = require_tenant(services.tenants.as_ref()).expect("demo tenant");
        let request = ExportRequest {
            scope: demo_scope(tenant, NaiveDate::from_ymd_opt(2025, 6, 15).expect("date")),
            format: ExportFormat::Csv,
            language: Language::En,
            initiatives: demo_initiatives(),
            charts: ChartSet::default(),
        };
        let artifact = services.exporter.export(&request).expect("export succeeds");
        assert_eq!(artifact.filename, "AqlHR_CCI_Wave_2_data.csv");
    }
}
