use super::domain::{AnalysisContext, UnknownVariant};
use crate::trends::{Metric, TimeSeriesPoint};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Selects which [`ScoringStrategy`] the engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    RuleBased,
    Statistical,
    Ml,
}

impl ScorerKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RuleBased => "rule",
            Self::Statistical => "statistical",
            Self::Ml => "ml",
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScorerKind {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rule" | "rule_based" | "rule-based" => Ok(Self::RuleBased),
            "statistical" | "stats" => Ok(Self::Statistical),
            "ml" => Ok(Self::Ml),
            _ => Err(UnknownVariant {
                kind: "scorer",
                value: raw.to_string(),
            }),
        }
    }
}

/// Observation backing the training/retention opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingEvidence {
    pub training_hours: u32,
    pub retention_rate: f64,
}

pub const TRAINING_EVIDENCE: [TrainingEvidence; 3] = [
    TrainingEvidence {
        training_hours: 40,
        retention_rate: 0.92,
    },
    TrainingEvidence {
        training_hours: 20,
        retention_rate: 0.76,
    },
    TrainingEvidence {
        training_hours: 60,
        retention_rate: 0.95,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    pub factor: String,
    pub weight: f64,
}

impl RiskFactor {
    fn new(factor: &str, weight: f64) -> Self {
        Self {
            factor: factor.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnoverRisk {
    pub probability: f64,
    pub confidence: f64,
    pub factors: Vec<RiskFactor>,
}

/// Logistic turnover model over three normalized features: engagement
/// decline, high-risk share and headcount contraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogisticModel {
    pub bias: f64,
    pub weights: [f64; 3],
}

impl Default for LogisticModel {
    fn default() -> Self {
        Self {
            bias: -0.5,
            weights: [2.0, 8.0, 5.0],
        }
    }
}

impl LogisticModel {
    pub fn probability(&self, features: [f64; 3]) -> f64 {
        let z = self.bias
            + self
                .weights
                .iter()
                .zip(features)
                .map(|(weight, feature)| weight * feature)
                .sum::<f64>();
        1.0 / (1.0 + (-z).exp())
    }
}

const RULE_ATTENDANCE_SIGNIFICANCE: f64 = 0.78;
const RULE_TURNOVER_PROBABILITY: f64 = 0.73;
const RULE_TURNOVER_CONFIDENCE: f64 = 0.84;
const CORRELATION_WINDOW: usize = 30;

/// How the engine scores patterns. The rule-based variant reproduces fixed
/// calibration constants; the others derive scores from the loaded series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScoringStrategy {
    #[default]
    RuleBased,
    Statistical,
    Ml(LogisticModel),
}

impl From<ScorerKind> for ScoringStrategy {
    fn from(kind: ScorerKind) -> Self {
        match kind {
            ScorerKind::RuleBased => Self::RuleBased,
            ScorerKind::Statistical => Self::Statistical,
            ScorerKind::Ml => Self::Ml(LogisticModel::default()),
        }
    }
}

impl ScoringStrategy {
    pub fn kind(&self) -> ScorerKind {
        match self {
            Self::RuleBased => ScorerKind::RuleBased,
            Self::Statistical => ScorerKind::Statistical,
            Self::Ml(_) => ScorerKind::Ml,
        }
    }

    /// Strength of the attendance/performance link. Engagement and
    /// compliance scores stand in for the two sides.
    pub fn attendance_significance(&self, points: &[TimeSeriesPoint]) -> f64 {
        match self {
            Self::RuleBased => RULE_ATTENDANCE_SIGNIFICANCE,
            Self::Statistical | Self::Ml(_) => {
                let recent = &points[points.len().saturating_sub(CORRELATION_WINDOW)..];
                let (left, right): (Vec<f64>, Vec<f64>) = recent
                    .iter()
                    .filter_map(|point| {
                        Some((
                            point.value(Metric::ExperienceScore)?,
                            point.value(Metric::ComplianceScore)?,
                        ))
                    })
                    .unzip();
                pearson(&left, &right).map(f64::abs).unwrap_or(0.0)
            }
        }
    }

    /// Evidence for the training/retention opportunity, if the scorer
    /// considers it present.
    pub fn training_retention(&self) -> Option<Vec<TrainingEvidence>> {
        match self {
            Self::RuleBased => Some(TRAINING_EVIDENCE.to_vec()),
            Self::Statistical | Self::Ml(_) => {
                let hours: Vec<f64> = TRAINING_EVIDENCE
                    .iter()
                    .map(|row| f64::from(row.training_hours))
                    .collect();
                let retention: Vec<f64> =
                    TRAINING_EVIDENCE.iter().map(|row| row.retention_rate).collect();
                pearson(&hours, &retention)
                    .filter(|correlation| *correlation > 0.5)
                    .map(|_| TRAINING_EVIDENCE.to_vec())
            }
        }
    }

    pub fn turnover_risk(&self, context: &AnalysisContext) -> TurnoverRisk {
        match self {
            Self::RuleBased => TurnoverRisk {
                probability: RULE_TURNOVER_PROBABILITY,
                confidence: RULE_TURNOVER_CONFIDENCE,
                factors: vec![
                    RiskFactor::new("satisfaction_decline", 0.4),
                    RiskFactor::new("market_competition", 0.3),
                    RiskFactor::new("performance_plateau", 0.3),
                ],
            },
            Self::Statistical => {
                let headcount: Vec<f64> = context
                    .series
                    .points()
                    .iter()
                    .filter_map(|point| point.value(Metric::TotalEmployees))
                    .collect();
                let steps = headcount.len().saturating_sub(1);
                let declines = headcount
                    .windows(2)
                    .filter(|pair| pair[1] < pair[0])
                    .count();
                let probability = if steps == 0 {
                    0.0
                } else {
                    declines as f64 / steps as f64
                };
                TurnoverRisk {
                    probability,
                    confidence: (steps as f64 / 90.0).min(1.0),
                    factors: vec![RiskFactor::new("headcount_decline_days", probability)],
                }
            }
            Self::Ml(model) => {
                let features = turnover_features(context);
                let probability = model.probability(features);
                TurnoverRisk {
                    probability,
                    confidence: 0.5 + (probability - 0.5).abs(),
                    factors: vec![
                        RiskFactor::new("engagement_decline", features[0]),
                        RiskFactor::new("high_risk_share", features[1]),
                        RiskFactor::new("headcount_contraction", features[2]),
                    ],
                }
            }
        }
    }
}

fn turnover_features(context: &AnalysisContext) -> [f64; 3] {
    let points = context.series.points();
    let experience: Vec<f64> = points
        .iter()
        .filter_map(|point| point.value(Metric::ExperienceScore))
        .collect();
    let engagement_decline = match (experience.first(), experience.last()) {
        (Some(first), Some(last)) => ((first - last) / 10.0).max(0.0),
        _ => 0.0,
    };

    let high_risk_share = match context.series.latest() {
        Some(point) => match (
            point.value(Metric::HighRiskCount),
            point.value(Metric::TotalEmployees),
        ) {
            (Some(risky), Some(total)) if total > 0.0 => risky / total,
            _ => 0.0,
        },
        None => 0.0,
    };

    let contraction = context
        .metrics
        .turnover_trend
        .as_ref()
        .map(|change| (-change.value / 100.0).max(0.0))
        .unwrap_or(0.0);

    [engagement_decline, high_risk_share, contraction]
}

/// Sample Pearson correlation; `None` for fewer than three pairs or a flat side.
pub fn pearson(left: &[f64], right: &[f64]) -> Option<f64> {
    let n = left.len().min(right.len());
    if n < 3 {
        return None;
    }
    let (left, right) = (&left[..n], &right[..n]);
    let mean_left = left.iter().sum::<f64>() / n as f64;
    let mean_right = right.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_left = 0.0;
    let mut var_right = 0.0;
    for (a, b) in left.iter().zip(right) {
        let da = a - mean_left;
        let db = b - mean_right;
        covariance += da * db;
        var_left += da * da;
        var_right += db * db;
    }
    if var_left == 0.0 || var_right == 0.0 {
        return None;
    }
    Some(covariance / (var_left.sqrt() * var_right.sqrt()))
}
