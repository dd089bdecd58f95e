use crate::cci::ExportError;
use crate::config::ConfigError;
use crate::insights::InsightError;
use crate::telemetry::TelemetryError;
use crate::tenant::TenantResolutionError;
use crate::trends::TrendError;
use crate::workforce::WorkforceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Tenant(TenantResolutionError),
    Workforce(WorkforceError),
    Trends(TrendError),
    Insights(InsightError),
    Export(ExportError),
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Tenant(_)
            | AppError::Workforce(WorkforceError::Tenant(_))
            | AppError::Trends(TrendError::Tenant(_))
            | AppError::Insights(InsightError::Tenant(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Export(ExportError::MissingOverview { .. }) => StatusCode::NOT_FOUND,
            AppError::Workforce(_)
            | AppError::Trends(_)
            | AppError::Insights(_)
            | AppError::Export(ExportError::Source(_) | ExportError::Decode(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Tenant(err) => write!(f, "tenant error: {}", err),
            AppError::Workforce(err) => write!(f, "workforce error: {}", err),
            AppError::Trends(err) => write!(f, "trend error: {}", err),
            AppError::Insights(err) => write!(f, "insight error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
            AppError::BadRequest(message) => write!(f, "bad request: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Tenant(err) => Some(err),
            AppError::Workforce(err) => Some(err),
            AppError::Trends(err) => Some(err),
            AppError::Insights(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::BadRequest(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<TenantResolutionError> for AppError {
    fn from(value: TenantResolutionError) -> Self {
        Self::Tenant(value)
    }
}

impl From<WorkforceError> for AppError {
    fn from(value: WorkforceError) -> Self {
        Self::Workforce(value)
    }
}

impl From<TrendError> for AppError {
    fn from(value: TrendError) -> Self {
        Self::Trends(value)
    }
}

impl From<InsightError> for AppError {
    fn from(value: InsightError) -> Self {
        Self::Insights(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}
