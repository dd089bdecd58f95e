//! Cross-module insight generation: the pure engine, its scoring strategies,
//! the external-factor probes and the recurring scheduler around them.

mod agent;
pub mod domain;
mod engine;
pub mod factors;
pub mod scoring;
mod scheduler;

pub use agent::{InsightAgent, InsightError};
pub use domain::{
    AnalysisBatch, AnalysisContext, CrossModuleConnection, CurrentMetrics, ExternalFactors,
    Insight, InsightFilter, InsightPriority, InsightType, Season, UnknownVariant,
};
pub use engine::{connection_catalogue, EngineSettings, InsightEngine};
pub use factors::{
    is_cultural_period, season_for_month, ExternalFactorProbes, FixedWeather, ProbeError,
    WeatherProbe,
};
pub use scheduler::InsightScheduler;
pub use scoring::{LogisticModel, ScorerKind, ScoringStrategy, TurnoverRisk};
