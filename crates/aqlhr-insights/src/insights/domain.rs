use crate::trends::{MonthOverMonth, TrendSeries};
use crate::workforce::HeadcountSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Connection,
    Prediction,
    Recommendation,
    Alert,
    Opportunity,
}

impl InsightType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Prediction => "prediction",
            Self::Recommendation => "recommendation",
            Self::Alert => "alert",
            Self::Opportunity => "opportunity",
        }
    }
}

impl FromStr for InsightType {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "connection" => Ok(Self::Connection),
            "prediction" => Ok(Self::Prediction),
            "recommendation" => Ok(Self::Recommendation),
            "alert" => Ok(Self::Alert),
            "opportunity" => Ok(Self::Opportunity),
            _ => Err(UnknownVariant {
                kind: "insight type",
                value: raw.to_string(),
            }),
        }
    }
}

/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl InsightPriority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for InsightPriority {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(UnknownVariant {
                kind: "priority",
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub source_modules: BTreeSet<String>,
    pub actionable: bool,
    pub priority: InsightPriority,
    pub reasoning: String,
    pub data_points: Vec<Value>,
    pub created_at: DateTime<Utc>,
}

impl Insight {
    pub fn has_source(&self, module: &str) -> bool {
        self.source_modules.contains(module)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossModuleConnection {
    pub from_module: String,
    pub to_module: String,
    pub relationship_type: String,
    pub strength: f64,
    pub impact_factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Signals from outside the HR data that shape recommendations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalFactors {
    pub season: Season,
    pub cultural_period: bool,
    /// `None` when the weather probe could not be read.
    pub temperature_c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentMetrics {
    pub total_employees: u32,
    pub localization_rate: f64,
    /// Month-over-month change in total headcount.
    pub turnover_trend: Option<MonthOverMonth>,
}

/// Everything one analysis cycle looks at.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisContext {
    pub headcount: HeadcountSummary,
    pub series: TrendSeries,
    pub metrics: CurrentMetrics,
    pub external: ExternalFactors,
    pub as_of: DateTime<Utc>,
}

/// Output of one cycle; replaces the previous batch wholesale.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisBatch {
    pub insights: Vec<Insight>,
    pub connections: Vec<CrossModuleConnection>,
    pub reasoning: String,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Conjunction of the batch query helpers; unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsightFilter {
    pub insight_type: Option<InsightType>,
    pub priority: Option<InsightPriority>,
    pub actionable_only: bool,
}

impl InsightFilter {
    pub fn matches(&self, insight: &Insight) -> bool {
        self.insight_type
            .map_or(true, |wanted| insight.insight_type == wanted)
            && self.priority.map_or(true, |wanted| insight.priority == wanted)
            && (!self.actionable_only || insight.actionable)
    }
}

impl AnalysisBatch {
    pub fn filtered(&self, filter: &InsightFilter) -> Vec<&Insight> {
        self.insights
            .iter()
            .filter(|insight| filter.matches(insight))
            .collect()
    }

    pub fn by_type(&self, insight_type: InsightType) -> Vec<&Insight> {
        self.filtered(&InsightFilter {
            insight_type: Some(insight_type),
            ..InsightFilter::default()
        })
    }

    pub fn by_priority(&self, priority: InsightPriority) -> Vec<&Insight> {
        self.filtered(&InsightFilter {
            priority: Some(priority),
            ..InsightFilter::default()
        })
    }

    pub fn actionable(&self) -> Vec<&Insight> {
        self.filtered(&InsightFilter {
            actionable_only: true,
            ..InsightFilter::default()
        })
    }
}
