use crate::cli::ServeArgs;
use crate::demo::demo_services;
use crate::infra::AppState;
use crate::routes::router;
use aqlhr_insights::clock::SystemClock;
use aqlhr_insights::config::AppConfig;
use aqlhr_insights::error::AppError;
use aqlhr_insights::insights::InsightScheduler;
use aqlhr_insights::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = demo_services(&config, Arc::new(SystemClock))?;
    let scheduler = InsightScheduler::new(
        Arc::clone(&services.agent),
        config.insights.analysis_interval,
    );

    let app = router(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    scheduler.start();
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        interval_secs = config.insights.analysis_interval.as_secs(),
        scorer = ?config.insights.scorer,
        "aqlhr insight service ready"
    );

    let served = axum::serve(listener, app).await;
    scheduler.stop();
    served?;
    Ok(())
}
