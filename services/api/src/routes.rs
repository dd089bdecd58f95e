use crate::infra::{deserialize_optional_date, AppState, Services};
use aqlhr_insights::cci::{
    ChartSet, ExportFormat, ExportRequest, ExportScope, Initiative, Language,
};
use aqlhr_insights::error::AppError;
use aqlhr_insights::insights::{
    CrossModuleConnection, Insight, InsightFilter, InsightPriority, InsightType,
};
use aqlhr_insights::tenant::require_tenant;
use aqlhr_insights::trends::{
    metric_values, trend_direction, Alert, Metric, MonthOverMonth, SparklinePoint,
    TrendDirection,
};
use aqlhr_insights::workforce::WorkforceSnapshot;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub(crate) fn router(services: Services) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/workforce/headcount", get(headcount_endpoint))
        .route("/api/v1/trends", get(trends_endpoint))
        .route("/api/v1/insights", get(insights_endpoint))
        .route("/api/v1/insights/refresh", post(refresh_insights_endpoint))
        .route("/api/v1/cci/export", post(cci_export_endpoint))
        .with_state(services)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn headcount_endpoint(
    State(services): State<Services>,
) -> Result<Json<WorkforceSnapshot>, AppError> {
    let snapshot = services.agent.workforce().refresh()?;
    Ok(Json(snapshot))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TrendQuery {
    #[serde(default)]
    pub(crate) metric: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MetricTrend {
    pub(crate) metric: Metric,
    pub(crate) label: &'static str,
    pub(crate) latest: Option<f64>,
    pub(crate) month_over_month: Option<MonthOverMonth>,
    pub(crate) direction: TrendDirection,
    pub(crate) sparkline: Vec<SparklinePoint>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TrendResponse {
    pub(crate) window_days: u32,
    pub(crate) points: usize,
    pub(crate) metrics: Vec<MetricTrend>,
    pub(crate) alerts: Vec<Alert>,
}

pub(crate) async fn trends_endpoint(
    State(services): State<Services>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, AppError> {
    let metrics = match query.metric.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => vec![raw
            .parse::<Metric>()
            .map_err(|err| AppError::BadRequest(err.to_string()))?],
        _ => Metric::ALL.to_vec(),
    };

    let loader = services.agent.trends();
    let snapshot = loader.refresh()?;
    let points = snapshot.series.points();
    let metrics = metrics
        .into_iter()
        .map(|metric| MetricTrend {
            metric,
            label: metric.label(),
            latest: snapshot.series.latest().and_then(|point| point.value(metric)),
            month_over_month: snapshot.month_over_month(metric),
            direction: trend_direction(&metric_values(points, metric)),
            sparkline: snapshot.sparkline(metric).iter().collect(),
        })
        .collect();

    Ok(Json(TrendResponse {
        window_days: loader.window_days(),
        points: points.len(),
        metrics,
        alerts: snapshot.alerts.clone(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct InsightQuery {
    #[serde(default, rename = "type")]
    pub(crate) insight_type: Option<String>,
    #[serde(default)]
    pub(crate) priority: Option<String>,
    #[serde(default)]
    pub(crate) actionable: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InsightResponse {
    pub(crate) insights: Vec<Insight>,
    pub(crate) connections: Vec<CrossModuleConnection>,
    pub(crate) reasoning: String,
    pub(crate) generated_at: Option<DateTime<Utc>>,
    pub(crate) cycles_completed: u64,
}

pub(crate) async fn insights_endpoint(
    State(services): State<Services>,
    Query(query): Query<InsightQuery>,
) -> Result<Json<InsightResponse>, AppError> {
    let insight_type = query
        .insight_type
        .as_deref()
        .map(str::parse::<InsightType>)
        .transpose()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    let priority = query
        .priority
        .as_deref()
        .map(str::parse::<InsightPriority>)
        .transpose()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let filter = InsightFilter {
        insight_type,
        priority,
        actionable_only: query.actionable.unwrap_or(false),
    };
    let batch = services.agent.latest();
    let insights = batch.filtered(&filter).into_iter().cloned().collect();

    Ok(Json(InsightResponse {
        insights,
        connections: batch.connections,
        reasoning: batch.reasoning,
        generated_at: batch.generated_at,
        cycles_completed: services.agent.cycles_completed(),
    }))
}

pub(crate) async fn refresh_insights_endpoint(
    State(services): State<Services>,
) -> Result<Json<InsightResponse>, AppError> {
    let batch = services.agent.run_cycle()?;
    Ok(Json(InsightResponse {
        insights: batch.insights,
        connections: batch.connections,
        reasoning: batch.reasoning,
        generated_at: batch.generated_at,
        cycles_completed: services.agent.cycles_completed(),
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CciExportPayload {
    pub(crate) survey_id: String,
    pub(crate) wave_id: String,
    #[serde(default)]
    pub(crate) survey_name: Option<String>,
    #[serde(default)]
    pub(crate) wave_label: Option<String>,
    #[serde(default)]
    pub(crate) wave_no: u32,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) as_of: Option<NaiveDate>,
    pub(crate) format: ExportFormat,
    #[serde(default)]
    pub(crate) language: Language,
    #[serde(default)]
    pub(crate) initiatives: Vec<Initiative>,
}

/// Streams the rendered artifact back as a download.
pub(crate) async fn cci_export_endpoint(
    State(services): State<Services>,
    Json(payload): Json<CciExportPayload>,
) -> Result<Response, AppError> {
    let tenant_id = require_tenant(services.tenants.as_ref())?;
    let wave_label = payload
        .wave_label
        .unwrap_or_else(|| payload.wave_id.clone());
    let request = ExportRequest {
        scope: ExportScope {
            tenant_id,
            survey_name: payload
                .survey_name
                .unwrap_or_else(|| payload.survey_id.clone()),
            survey_id: payload.survey_id,
            wave_id: payload.wave_id,
            wave_label,
            wave_no: payload.wave_no,
            as_of: payload
                .as_of
                .unwrap_or_else(|| services.clock.today()),
        },
        format: payload.format,
        language: payload.language,
        initiatives: payload.initiatives,
        charts: ChartSet::default(),
    };

    let artifact = services.exporter.export(&request)?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        artifact.filename
    ))
    .map_err(|err| AppError::BadRequest(err.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(artifact.mime)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}
