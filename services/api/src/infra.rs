use aqlhr_insights::cci::{CciExporter, DocumentRenderer};
use aqlhr_insights::clock::Clock;
use aqlhr_insights::config::AppConfig;
use aqlhr_insights::insights::{
    EngineSettings, ExternalFactorProbes, InsightAgent, InsightEngine, ScoringStrategy,
};
use aqlhr_insights::source::DataSource;
use aqlhr_insights::tenant::{
    DemoFallbackResolver, StaticTenantResolver, TenantId, TenantResolver,
};
use aqlhr_insights::trends::TrendSeriesLoader;
use aqlhr_insights::workforce::EmployeeAggregator;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Components shared by the HTTP handlers and the CLI commands.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) agent: Arc<InsightAgent>,
    pub(crate) exporter: Arc<CciExporter>,
    pub(crate) tenants: Arc<dyn TenantResolver>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Services {
    pub(crate) fn build(
        config: &AppConfig,
        source: Arc<dyn DataSource>,
        tenants: Arc<dyn TenantResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let workforce = Arc::new(EmployeeAggregator::new(source.clone(), tenants.clone()));
        let trends = Arc::new(TrendSeriesLoader::new(
            source.clone(),
            tenants.clone(),
            clock.clone(),
            config.insights.trend_days,
        ));
        let engine = InsightEngine::new(
            EngineSettings::from(&config.insights),
            ScoringStrategy::from(config.insights.scorer),
        );
        let agent = Arc::new(InsightAgent::new(
            workforce,
            trends,
            ExternalFactorProbes::default(),
            engine,
            clock.clone(),
        ));
        let exporter = Arc::new(CciExporter::new(
            source,
            Arc::new(DocumentRenderer),
            config.export.brand.clone(),
        ));

        Self {
            agent,
            exporter,
            tenants,
            clock,
        }
    }
}

/// No session layer sits in front of the service yet, so every request
/// lands on the configured demo tenant.
pub(crate) fn session_resolver(demo: TenantId) -> Arc<dyn TenantResolver> {
    Arc::new(DemoFallbackResolver::new(
        StaticTenantResolver::default(),
        demo,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
