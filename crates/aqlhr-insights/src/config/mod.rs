use crate::insights::ScorerKind;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub insights: InsightConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let interval_secs: u64 = parse_var("AQLHR_ANALYSIS_INTERVAL_SECS", 300)?;
        if interval_secs == 0 {
            return Err(ConfigError::NonPositive {
                key: "AQLHR_ANALYSIS_INTERVAL_SECS",
            });
        }

        let trend_days: u32 = parse_var("AQLHR_TREND_DAYS", 30)?;
        if trend_days == 0 {
            return Err(ConfigError::NonPositive {
                key: "AQLHR_TREND_DAYS",
            });
        }

        let scorer = match env::var("AQLHR_SCORER") {
            Ok(raw) => raw
                .parse::<ScorerKind>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "AQLHR_SCORER",
                    value: raw,
                })?,
            Err(_) => ScorerKind::RuleBased,
        };

        let insights = InsightConfig {
            analysis_interval: Duration::from_secs(interval_secs),
            trend_days,
            localization_threshold: parse_var("AQLHR_LOCALIZATION_THRESHOLD", 65.0)?,
            localization_warning_margin: parse_var("AQLHR_LOCALIZATION_WARNING_MARGIN", 5.0)?,
            heat_threshold_c: parse_var("AQLHR_HEAT_THRESHOLD_C", 40.0)?,
            scorer,
            demo_tenant: env::var("AQLHR_DEMO_TENANT").unwrap_or_else(|_| "demo".to_string()),
        };

        let export = ExportConfig {
            brand: env::var("AQLHR_BRAND").unwrap_or_else(|_| "AqlHR".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
                include_targets: environment != AppEnvironment::Production,
            },
            insights,
            export,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: AppEnvironment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
                ansi: true,
                include_targets: true,
            },
            insights: InsightConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
    pub include_targets: bool,
}

/// Analysis cadence and rule thresholds for the insight agent.
#[derive(Debug, Clone)]
pub struct InsightConfig {
    pub analysis_interval: Duration,
    pub trend_days: u32,
    pub localization_threshold: f64,
    pub localization_warning_margin: f64,
    pub heat_threshold_c: f64,
    pub scorer: ScorerKind,
    pub demo_tenant: String,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            analysis_interval: Duration::from_secs(300),
            trend_days: 30,
            localization_threshold: 65.0,
            localization_warning_margin: 5.0,
            heat_threshold_c: 40.0,
            scorer: ScorerKind::RuleBased,
            demo_tenant: "demo".to_string(),
        }
    }
}

/// Branding applied to exported culture reports.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub brand: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            brand: "AqlHR".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    NonPositive { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an unsupported value '{value}'")
            }
            ConfigError::NonPositive { key } => write!(f, "{key} must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::NonPositive { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "AQLHR_ANALYSIS_INTERVAL_SECS",
            "AQLHR_TREND_DAYS",
            "AQLHR_LOCALIZATION_THRESHOLD",
            "AQLHR_LOCALIZATION_WARNING_MARGIN",
            "AQLHR_HEAT_THRESHOLD_C",
            "AQLHR_SCORER",
            "AQLHR_DEMO_TENANT",
            "AQLHR_BRAND",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.insights.analysis_interval, Duration::from_secs(300));
        assert_eq!(config.insights.trend_days, 30);
        assert_eq!(config.insights.localization_threshold, 65.0);
        assert_eq!(config.insights.scorer, ScorerKind::RuleBased);
        assert_eq!(config.insights.demo_tenant, "demo");
        assert_eq!(config.export.brand, "AqlHR");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_zero_analysis_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AQLHR_ANALYSIS_INTERVAL_SECS", "0");
        match AppConfig::load() {
            Err(ConfigError::NonPositive { key }) => {
                assert_eq!(key, "AQLHR_ANALYSIS_INTERVAL_SECS")
            }
            other => panic!("expected non-positive interval error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn names_the_variable_holding_a_bad_number() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AQLHR_HEAT_THRESHOLD_C", "hot");
        let err = AppConfig::load().expect_err("threshold must be numeric");
        assert!(err.to_string().contains("AQLHR_HEAT_THRESHOLD_C"));
        reset_env();
    }

    #[test]
    fn selects_scorer_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AQLHR_SCORER", "statistical");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.insights.scorer, ScorerKind::Statistical);
        reset_env();
    }
}
