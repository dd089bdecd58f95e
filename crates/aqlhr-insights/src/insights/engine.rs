use super::domain::{
    AnalysisBatch, AnalysisContext, CrossModuleConnection, Insight, InsightPriority, InsightType,
};
use super::scoring::ScoringStrategy;
use crate::config::InsightConfig;
use crate::trends::{metric_values, trend_direction, Metric, TrendDirection};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt::Write as _;

const SIGNIFICANCE_FLOOR: f64 = 0.7;
const ATTENDANCE_MIN_POINTS: usize = 30;
const TURNOVER_MIN_POINTS: usize = 60;
const TURNOVER_PROBABILITY_FLOOR: f64 = 0.6;
const LOCALIZATION_ALERT_CONFIDENCE: f64 = 0.95;
const TRAINING_CONFIDENCE: f64 = 0.82;
const BUDGET_CONFIDENCE: f64 = 0.76;
const CULTURAL_CONFIDENCE: f64 = 0.90;
const HEAT_CONFIDENCE: f64 = 0.95;

/// Thresholds the engine applies to each context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub localization_threshold: f64,
    pub localization_warning_margin: f64,
    pub heat_threshold_c: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&InsightConfig::default())
    }
}

impl From<&InsightConfig> for EngineSettings {
    fn from(config: &InsightConfig) -> Self {
        Self {
            localization_threshold: config.localization_threshold,
            localization_warning_margin: config.localization_warning_margin,
            heat_threshold_c: config.heat_threshold_c,
        }
    }
}

/// Turns an [`AnalysisContext`] into a batch of insights. Pure: the same
/// context and settings always produce the same batch.
#[derive(Debug, Clone, Default)]
pub struct InsightEngine {
    settings: EngineSettings,
    scorer: ScoringStrategy,
}

impl InsightEngine {
    pub fn new(settings: EngineSettings, scorer: ScoringStrategy) -> Self {
        Self { settings, scorer }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn scorer(&self) -> ScoringStrategy {
        self.scorer
    }

    pub fn analyze(&self, context: &AnalysisContext) -> AnalysisBatch {
        let patterns = self.detect_patterns(context);
        let predictions = self.predictions(context);
        let recommendations = self.recommendations(context);
        let reasoning = self.reasoning(context, &patterns, &predictions, &recommendations);

        let mut insights = patterns;
        insights.extend(predictions);
        insights.extend(recommendations);

        AnalysisBatch {
            insights,
            connections: connection_catalogue(),
            reasoning,
            generated_at: Some(context.as_of),
        }
    }

    fn detect_patterns(&self, context: &AnalysisContext) -> Vec<Insight> {
        let mut patterns = Vec::new();
        let points = context.series.points();

        if points.len() > ATTENDANCE_MIN_POINTS {
            let significance = self.scorer.attendance_significance(points);
            if significance > SIGNIFICANCE_FLOOR {
                let recent = &points[points.len() - ATTENDANCE_MIN_POINTS..];
                patterns.push(Insight {
                    id: insight_id("pattern-attendance", context),
                    insight_type: InsightType::Connection,
                    title: "Attendance and performance move together".to_string(),
                    description: format!(
                        "Attendance and team performance are correlated at {:.1}%",
                        significance * 100.0
                    ),
                    confidence: significance,
                    source_modules: modules(&["attendance", "performance"]),
                    actionable: true,
                    priority: InsightPriority::High,
                    reasoning: "Teams above 95% attendance score markedly higher on performance \
                                reviews; attendance interventions are a lever on productivity."
                        .to_string(),
                    data_points: recent
                        .iter()
                        .filter_map(|point| serde_json::to_value(point).ok())
                        .collect(),
                    created_at: context.as_of,
                });
            }
        }

        if let Some(alert) = self.localization_alert(context) {
            patterns.push(alert);
        }

        if let Some(evidence) = self.scorer.training_retention() {
            patterns.push(Insight {
                id: insight_id("pattern-training-retention", context),
                insight_type: InsightType::Opportunity,
                title: "Training investment opportunity".to_string(),
                description: "Employees with 40+ training hours are retained far more often"
                    .to_string(),
                confidence: TRAINING_CONFIDENCE,
                source_modules: modules(&["learning", "hr", "performance"]),
                actionable: true,
                priority: InsightPriority::Medium,
                reasoning: "Learning records line up with retention: more training hours, fewer \
                            exits. A modest increase in training spend should reduce turnover."
                    .to_string(),
                data_points: evidence
                    .iter()
                    .filter_map(|row| serde_json::to_value(row).ok())
                    .collect(),
                created_at: context.as_of,
            });
        }

        patterns
    }

    fn localization_alert(&self, context: &AnalysisContext) -> Option<Insight> {
        let rate = context.metrics.localization_rate;
        let threshold = self.settings.localization_threshold;
        let ceiling = threshold + self.settings.localization_warning_margin.max(0.0);
        let direction = trend_direction(&metric_values(
            context.series.points(),
            Metric::LocalizationRate,
        ));

        if direction != TrendDirection::Declining || rate >= ceiling {
            return None;
        }

        let (title, description) = if rate < threshold {
            (
                "Localization rate below target threshold".to_string(),
                format!(
                    "Localization is at {rate:.1}% against a {threshold:.1}% floor and still \
                     falling; intervention needed now"
                ),
            )
        } else {
            (
                "Localization rate approaching target threshold".to_string(),
                format!(
                    "Localization is at {rate:.1}%, within {:.1} points of the {threshold:.1}% \
                     floor and falling",
                    rate - threshold
                ),
            )
        };

        Some(Insight {
            id: insight_id("pattern-localization", context),
            insight_type: InsightType::Alert,
            title,
            description,
            confidence: LOCALIZATION_ALERT_CONFIDENCE,
            source_modules: modules(&["hr", "compliance", "recruitment"]),
            actionable: true,
            priority: InsightPriority::Critical,
            reasoning: "The localization rate has declined across the recent snapshots; left \
                        alone this pattern tends to become a compliance breach within 60 days."
                .to_string(),
            data_points: vec![serde_json::to_value(&context.metrics).unwrap_or(Value::Null)],
            created_at: context.as_of,
        })
    }

    fn predictions(&self, context: &AnalysisContext) -> Vec<Insight> {
        let mut predictions = Vec::new();

        if context.series.len() > TURNOVER_MIN_POINTS {
            let risk = self.scorer.turnover_risk(context);
            if risk.probability > TURNOVER_PROBABILITY_FLOOR {
                predictions.push(Insight {
                    id: insight_id("prediction-turnover", context),
                    insight_type: InsightType::Prediction,
                    title: "High turnover risk predicted".to_string(),
                    description: format!(
                        "{:.0}% probability of a 15% turnover spike next quarter",
                        risk.probability * 100.0
                    ),
                    confidence: risk.confidence,
                    source_modules: modules(&["hr", "performance", "satisfaction"]),
                    actionable: true,
                    priority: InsightPriority::High,
                    reasoning: format!(
                        "{} scorer weighed engagement, performance and market pressure signals.",
                        self.scorer.kind().label()
                    ),
                    data_points: risk
                        .factors
                        .iter()
                        .filter_map(|factor| serde_json::to_value(factor).ok())
                        .collect(),
                    created_at: context.as_of,
                });
            }
        }

        predictions.push(Insight {
            id: insight_id("prediction-budget", context),
            insight_type: InsightType::Opportunity,
            title: "Budget optimization opportunity".to_string(),
            description: "Moving 8% of the training budget into retention programs could lift \
                          ROI by about a third"
                .to_string(),
            confidence: BUDGET_CONFIDENCE,
            source_modules: modules(&["payroll", "learning", "hr"]),
            actionable: true,
            priority: InsightPriority::Medium,
            reasoning: "Replacing a leaver costs far more than retaining them through targeted \
                        training."
                .to_string(),
            data_points: Vec::new(),
            created_at: context.as_of,
        });

        predictions
    }

    fn recommendations(&self, context: &AnalysisContext) -> Vec<Insight> {
        let mut recommendations = Vec::new();
        let external = &context.external;

        if external.cultural_period {
            recommendations.push(Insight {
                id: insight_id("rec-cultural-schedule", context),
                insight_type: InsightType::Recommendation,
                title: "Adapt schedules for the fasting month".to_string(),
                description: "Offer flexible hours and adjust performance targets for the period"
                    .to_string(),
                confidence: CULTURAL_CONFIDENCE,
                source_modules: modules(&["attendance", "cultural", "performance"]),
                actionable: true,
                priority: InsightPriority::High,
                reasoning: "Adapted schedules during the fasting month keep productivity steady \
                            and raise satisfaction."
                    .to_string(),
                data_points: Vec::new(),
                created_at: context.as_of,
            });
        }

        if let Some(temperature) = external.temperature_c {
            if temperature > self.settings.heat_threshold_c {
                recommendations.push(Insight {
                    id: insight_id("rec-heat-safety", context),
                    insight_type: InsightType::Recommendation,
                    title: "Activate heat safety protocol".to_string(),
                    description: "Extreme temperature: switch field crews to heat safety measures"
                        .to_string(),
                    confidence: HEAT_CONFIDENCE,
                    source_modules: modules(&["safety", "weather", "operations"]),
                    actionable: true,
                    priority: InsightPriority::Critical,
                    reasoning: format!(
                        "Temperature is {temperature:.0}°C, above the {:.0}°C trigger; heat \
                         incidents triple past this point.",
                        self.settings.heat_threshold_c
                    ),
                    data_points: vec![json!({
                        "temperature": temperature,
                        "safety_protocol": "heat_extreme",
                    })],
                    created_at: context.as_of,
                });
            }
        }

        recommendations
    }

    fn reasoning(
        &self,
        context: &AnalysisContext,
        patterns: &[Insight],
        predictions: &[Insight],
        recommendations: &[Insight],
    ) -> String {
        let mut digest = String::new();
        let _ = writeln!(digest, "AqlHR analysis summary ({} scorer)", self.scorer.kind());
        let _ = writeln!(
            digest,
            "Examined {} snapshots; found {} patterns, {} predictions, {} recommendations.",
            context.series.len(),
            patterns.len(),
            predictions.len(),
            recommendations.len()
        );
        let _ = writeln!(
            digest,
            "Workforce: {} active, localization {:.1}% ({} band).",
            context.metrics.total_employees,
            context.metrics.localization_rate,
            context.headcount.band.label()
        );
        match &context.metrics.turnover_trend {
            Some(change) => {
                let _ = writeln!(digest, "Headcount month over month: {}.", change.formatted);
            }
            None => {
                let _ = writeln!(digest, "Headcount month over month: not enough history.");
            }
        }
        let _ = writeln!(
            digest,
            "Context: {} season{}.",
            context.external.season,
            if context.external.cultural_period {
                ", fasting month schedule"
            } else {
                ""
            }
        );

        let mut ranked: Vec<&Insight> = patterns
            .iter()
            .chain(predictions)
            .chain(recommendations)
            .collect();
        ranked.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });
        if !ranked.is_empty() {
            let _ = writeln!(digest, "Top findings:");
            for insight in ranked.iter().take(3) {
                let _ = writeln!(
                    digest,
                    "- [{}] {} ({:.0}%)",
                    insight.priority.label(),
                    insight.title,
                    insight.confidence * 100.0
                );
            }
        }
        digest.trim_end().to_string()
    }
}

/// Relationships between modules that hold regardless of tenant data.
pub fn connection_catalogue() -> Vec<CrossModuleConnection> {
    [
        (
            "attendance",
            "performance",
            "positive_correlation",
            0.78,
            ["punctuality", "engagement", "team_dynamics"],
        ),
        (
            "learning",
            "retention",
            "retention_driver",
            0.82,
            ["skill_development", "career_satisfaction", "promotion_readiness"],
        ),
        (
            "safety",
            "productivity",
            "inverse_correlation",
            0.69,
            ["incident_rates", "confidence", "operational_efficiency"],
        ),
    ]
    .into_iter()
    .map(|(from, to, relationship, strength, factors)| CrossModuleConnection {
        from_module: from.to_string(),
        to_module: to.to_string(),
        relationship_type: relationship.to_string(),
        strength,
        impact_factors: factors.iter().map(|factor| factor.to_string()).collect(),
    })
    .collect()
}

fn insight_id(prefix: &str, context: &AnalysisContext) -> String {
    format!("{prefix}-{}", context.as_of.timestamp_millis())
}

fn modules(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::domain::{CurrentMetrics, ExternalFactors, Season};
    use crate::trends::{TimeSeriesPoint, TrendSeries};
    use crate::workforce::HeadcountSummary;
    use chrono::{Days, NaiveDate, TimeZone, Utc};

    fn context(rates: &[f64], month: u32, temperature_c: Option<f64>) -> AnalysisContext {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
        let points = rates
            .iter()
            .enumerate()
            .map(|(offset, rate)| {
                TimeSeriesPoint::empty(start + Days::new(offset as u64))
                    .with(Metric::LocalizationRate, *rate)
            })
            .collect();
        let headcount = HeadcountSummary::from_counts(100, 60);
        AnalysisContext {
            headcount,
            series: TrendSeries::new(points).expect("ordered"),
            metrics: CurrentMetrics {
                total_employees: headcount.total_active,
                localization_rate: headcount.localization_pct,
                turnover_trend: None,
            },
            external: ExternalFactors {
                season: crate::insights::season_for_month(month),
                cultural_period: crate::insights::is_cultural_period(month),
                temperature_c,
            },
            as_of: Utc
                .with_ymd_and_hms(2025, month, 10, 9, 0, 0)
                .single()
                .expect("valid instant"),
        }
    }

    #[test]
    fn short_series_skips_history_driven_insights() {
        let batch = InsightEngine::default().analyze(&context(&[60.0; 3], 6, None));
        assert!(batch.by_type(InsightType::Connection).is_empty());
        assert!(batch.by_type(InsightType::Prediction).is_empty());
        assert_eq!(batch.by_type(InsightType::Opportunity).len(), 2);
        assert_eq!(batch.connections.len(), 3);
    }

    #[test]
    fn long_series_adds_attendance_and_turnover_insights() {
        let batch = InsightEngine::default().analyze(&context(&[60.0; 61], 6, None));
        let connection = batch.by_type(InsightType::Connection);
        assert_eq!(connection.len(), 1);
        assert_eq!(connection[0].confidence, 0.78);
        assert_eq!(connection[0].data_points.len(), 30);
        assert!(connection[0].id.starts_with("pattern-attendance-"));

        let prediction = batch.by_type(InsightType::Prediction);
        assert_eq!(prediction.len(), 1);
        assert_eq!(prediction[0].confidence, 0.84);
    }

    #[test]
    fn stable_localization_does_not_alert() {
        let batch = InsightEngine::default().analyze(&context(&[60.0; 5], 6, None));
        assert!(batch.by_type(InsightType::Alert).is_empty());
    }

    #[test]
    fn declining_rate_far_above_threshold_does_not_alert() {
        let mut ctx = context(&[90.0, 89.0, 88.0, 86.0, 85.0], 6, None);
        ctx.metrics.localization_rate = 85.0;
        let batch = InsightEngine::default().analyze(&ctx);
        assert!(batch.by_type(InsightType::Alert).is_empty());
    }

    #[test]
    fn declining_rate_below_threshold_is_critical() {
        let mut ctx = context(&[66.0, 65.0, 63.0, 62.0, 61.0], 6, None);
        ctx.metrics.localization_rate = 61.0;
        let batch = InsightEngine::default().analyze(&ctx);
        let alerts = batch.by_type(InsightType::Alert);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].priority, InsightPriority::Critical);
        assert!(alerts[0].title.contains("below"));
    }

    #[test]
    fn heat_and_cultural_recommendations_follow_external_factors() {
        let hot_april = InsightEngine::default().analyze(&context(&[60.0; 3], 4, Some(42.0)));
        let recs = hot_april.by_type(InsightType::Recommendation);
        assert_eq!(recs.len(), 2);
        assert_eq!(
            hot_april.by_priority(InsightPriority::Critical).len(),
            1,
            "heat safety is the only critical item"
        );

        let mild_june = InsightEngine::default().analyze(&context(&[60.0; 3], 6, Some(38.0)));
        assert!(mild_june.by_type(InsightType::Recommendation).is_empty());
        assert_eq!(context(&[], 6, None).external.season, Season::Summer);
    }

    #[test]
    fn analysis_is_deterministic() {
        let ctx = context(&[70.0, 69.0, 68.0, 67.5, 67.0], 4, Some(42.0));
        let engine = InsightEngine::default();
        let first = engine.analyze(&ctx);
        let second = engine.analyze(&ctx);
        assert_eq!(first.insights, second.insights);
        assert_eq!(first.reasoning, second.reasoning);
        assert!(first.reasoning.contains("Top findings:"));
    }
}
