use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Dashboard KPI tracked per daily snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalEmployees,
    LocalizationRate,
    SafetyScore,
    ComplianceScore,
    ExperienceScore,
    HighRiskCount,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::TotalEmployees,
        Metric::LocalizationRate,
        Metric::SafetyScore,
        Metric::ComplianceScore,
        Metric::ExperienceScore,
        Metric::HighRiskCount,
    ];

    /// Column name in the snapshot table.
    pub const fn column(self) -> &'static str {
        match self {
            Self::TotalEmployees => "total_employees",
            Self::LocalizationRate => "saudization_rate",
            Self::SafetyScore => "hse_safety_score",
            Self::ComplianceScore => "compliance_score",
            Self::ExperienceScore => "employee_experience_10",
            Self::HighRiskCount => "predictive_risk_high",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::TotalEmployees => "Total Employees",
            Self::LocalizationRate => "Localization Rate",
            Self::SafetyScore => "Safety Score",
            Self::ComplianceScore => "Compliance Score",
            Self::ExperienceScore => "Employee Experience",
            Self::HighRiskCount => "High-Risk Employees",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|metric| {
                metric.column() == normalized
                    || serde_json::to_value(metric)
                        .ok()
                        .and_then(|value| value.as_str().map(|name| name == normalized))
                        .unwrap_or(false)
            })
            .ok_or_else(|| UnknownMetric(raw.to_string()))
    }
}

/// One daily KPI snapshot. Metric values that are missing or not numeric
/// decode as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    #[serde(rename = "snap_date", alias = "snapshot_date")]
    pub snapshot_date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_employees: Option<f64>,
    #[serde(
        rename = "saudization_rate",
        alias = "localization_rate",
        default,
        deserialize_with = "lenient_number"
    )]
    pub localization_rate: Option<f64>,
    #[serde(
        rename = "hse_safety_score",
        alias = "safety_score",
        default,
        deserialize_with = "lenient_number"
    )]
    pub safety_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub compliance_score: Option<f64>,
    #[serde(
        rename = "employee_experience_10",
        alias = "experience_score",
        default,
        deserialize_with = "lenient_number"
    )]
    pub experience_score: Option<f64>,
    #[serde(
        rename = "predictive_risk_high",
        alias = "high_risk_count",
        default,
        deserialize_with = "lenient_number"
    )]
    pub high_risk_count: Option<f64>,
}

impl TimeSeriesPoint {
    pub fn empty(snapshot_date: NaiveDate) -> Self {
        Self {
            snapshot_date,
            total_employees: None,
            localization_rate: None,
            safety_score: None,
            compliance_score: None,
            experience_score: None,
            high_risk_count: None,
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        let raw = match metric {
            Metric::TotalEmployees => self.total_employees,
            Metric::LocalizationRate => self.localization_rate,
            Metric::SafetyScore => self.safety_score,
            Metric::ComplianceScore => self.compliance_score,
            Metric::ExperienceScore => self.experience_score,
            Metric::HighRiskCount => self.high_risk_count,
        };
        raw.filter(|value| value.is_finite())
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        let slot = match metric {
            Metric::TotalEmployees => &mut self.total_employees,
            Metric::LocalizationRate => &mut self.localization_rate,
            Metric::SafetyScore => &mut self.safety_score,
            Metric::ComplianceScore => &mut self.compliance_score,
            Metric::ExperienceScore => &mut self.experience_score,
            Metric::HighRiskCount => &mut self.high_risk_count,
        };
        *slot = Some(value);
        self
    }
}

/// Numeric columns sometimes arrive as strings (numeric/decimal types) or as
/// garbage; keep numbers, parse numeric strings, drop everything else.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite()))
}

/// Daily points with strictly increasing dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TrendSeries(Vec<TimeSeriesPoint>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("snapshot dates must strictly increase ({previous} followed by {next})")]
pub struct SeriesOrderError {
    pub previous: NaiveDate,
    pub next: NaiveDate,
}

impl TrendSeries {
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<Self, SeriesOrderError> {
        if let Some(pair) = points
            .windows(2)
            .find(|pair| pair[0].snapshot_date >= pair[1].snapshot_date)
        {
            return Err(SeriesOrderError {
                previous: pair[0].snapshot_date,
                next: pair[1].snapshot_date,
            });
        }
        Ok(Self(points))
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn latest(&self) -> Option<&TimeSeriesPoint> {
        self.0.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    High,
    Medium,
    Low,
}

/// Threshold alert raised by the backend's dashboard rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub metric: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub current_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub threshold_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Change between the two most recent points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthOverMonth {
    pub value: f64,
    pub is_positive: bool,
    pub formatted: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SparklinePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Declining,
    Stable,
}

impl TrendDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Declining => "declining",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendSnapshot {
    pub series: TrendSeries,
    pub alerts: Vec<Alert>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date")
    }

    #[test]
    fn decodes_backend_column_names_leniently() {
        let point: TimeSeriesPoint = serde_json::from_value(json!({
            "snap_date": "2025-03-01",
            "total_employees": 1848,
            "saudization_rate": "67.5",
            "hse_safety_score": "n/a",
            "compliance_score": null
        }))
        .expect("decodes");
        assert_eq!(point.value(Metric::TotalEmployees), Some(1848.0));
        assert_eq!(point.value(Metric::LocalizationRate), Some(67.5));
        assert_eq!(point.value(Metric::SafetyScore), None);
        assert_eq!(point.value(Metric::ComplianceScore), None);
        assert_eq!(point.value(Metric::HighRiskCount), None);
    }

    #[test]
    fn rejects_out_of_order_dates() {
        let err = TrendSeries::new(vec![TimeSeriesPoint::empty(day(2)), TimeSeriesPoint::empty(day(2))])
            .expect_err("duplicate dates are not strictly increasing");
        assert_eq!(err.previous, day(2));
    }

    #[test]
    fn metric_parses_from_column_or_variant_name() {
        assert_eq!("saudization_rate".parse::<Metric>(), Ok(Metric::LocalizationRate));
        assert_eq!("localization_rate".parse::<Metric>(), Ok(Metric::LocalizationRate));
        assert!("headcount".parse::<Metric>().is_err());
    }
}
