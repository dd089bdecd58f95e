//! Daily KPI snapshots, dashboard alerts and the derived month-over-month and
//! sparkline views.

pub mod analysis;
pub mod domain;
mod loader;

pub use analysis::{metric_values, month_over_month, trend_direction, Sparkline};
pub use domain::{
    Alert, AlertSeverity, Metric, MonthOverMonth, SeriesOrderError, SparklinePoint,
    TimeSeriesPoint, TrendDirection, TrendSeries, TrendSnapshot, UnknownMetric,
};
pub use loader::{TrendError, TrendSeriesLoader, DEFAULT_BACKFILL_DAYS};
