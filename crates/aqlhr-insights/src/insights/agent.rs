use super::domain::{AnalysisBatch, AnalysisContext, CurrentMetrics};
use super::engine::InsightEngine;
use super::factors::ExternalFactorProbes;
use crate::clock::Clock;
use crate::state::{LoadState, StateSlot};
use crate::tenant::TenantResolutionError;
use crate::trends::{Metric, TrendError, TrendSeriesLoader, TrendSnapshot};
use crate::workforce::{EmployeeAggregator, WorkforceError, WorkforceSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, info_span, warn};

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error(transparent)]
    Tenant(#[from] TenantResolutionError),
    #[error(transparent)]
    Workforce(#[from] WorkforceError),
    #[error(transparent)]
    Trends(#[from] TrendError),
}

/// Gathers workforce and trend data, runs the engine and keeps the latest
/// batch.
pub struct InsightAgent {
    workforce: Arc<EmployeeAggregator>,
    trends: Arc<TrendSeriesLoader>,
    probes: ExternalFactorProbes,
    engine: InsightEngine,
    clock: Arc<dyn Clock>,
    latest: StateSlot<AnalysisBatch>,
    cycles: AtomicU64,
}

impl InsightAgent {
    pub fn new(
        workforce: Arc<EmployeeAggregator>,
        trends: Arc<TrendSeriesLoader>,
        probes: ExternalFactorProbes,
        engine: InsightEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            workforce,
            trends,
            probes,
            engine,
            clock,
            latest: StateSlot::new(AnalysisBatch::default()),
            cycles: AtomicU64::new(0),
        }
    }

    /// One full analysis pass. A missing tenant aborts the cycle. A transient
    /// fetch failure falls back to the loader's last successful snapshot and
    /// fails the cycle when there is none.
    pub fn run_cycle(&self) -> Result<AnalysisBatch, InsightError> {
        let span = info_span!("insight_cycle", cycle = self.cycles.load(Ordering::Relaxed) + 1);
        let _entered = span.enter();
        let ticket = self.latest.begin();

        let result = self.gather().map(|context| self.engine.analyze(&context));
        match result {
            Ok(batch) => {
                self.latest.commit(ticket, batch.clone());
                self.cycles.fetch_add(1, Ordering::AcqRel);
                info!(
                    insights = batch.insights.len(),
                    connections = batch.connections.len(),
                    "analysis cycle complete"
                );
                Ok(batch)
            }
            Err(err) => {
                self.latest.fail(ticket, err.to_string());
                Err(err)
            }
        }
    }

    pub fn latest(&self) -> AnalysisBatch {
        self.latest.data()
    }

    pub fn state(&self) -> LoadState<AnalysisBatch> {
        self.latest.snapshot()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    pub fn engine(&self) -> &InsightEngine {
        &self.engine
    }

    pub fn workforce(&self) -> &EmployeeAggregator {
        &self.workforce
    }

    pub fn trends(&self) -> &TrendSeriesLoader {
        &self.trends
    }

    pub fn detach(&self) {
        self.latest.detach();
        self.workforce.detach();
        self.trends.detach();
    }

    fn gather(&self) -> Result<AnalysisContext, InsightError> {
        let workforce = match self.workforce.refresh() {
            Ok(snapshot) => snapshot,
            Err(WorkforceError::Tenant(err)) => return Err(err.into()),
            Err(err) => match self.workforce.last_loaded() {
                Some(previous) => {
                    warn!(error = %err, "using last known headcount");
                    previous
                }
                None => return Err(err.into()),
            },
        };

        let trends = match self.trends.refresh() {
            Ok(snapshot) => snapshot,
            Err(TrendError::Tenant(err)) => return Err(err.into()),
            Err(err) => match self.trends.last_loaded() {
                Some(previous) => {
                    warn!(error = %err, "using last known trend series");
                    previous
                }
                None => return Err(err.into()),
            },
        };

        Ok(self.context(workforce, trends))
    }

    fn context(&self, workforce: WorkforceSnapshot, trends: TrendSnapshot) -> AnalysisContext {
        let headcount = workforce.summary;
        let as_of = self.clock.now();
        AnalysisContext {
            headcount,
            metrics: CurrentMetrics {
                total_employees: headcount.total_active,
                localization_rate: headcount.localization_pct,
                turnover_trend: trends.month_over_month(Metric::TotalEmployees),
            },
            series: trends.series,
            external: self.probes.collect(as_of.date_naive()),
            as_of,
        }
    }
}
