use super::analysis::{month_over_month, Sparkline};
use super::domain::{
    Alert, Metric, MonthOverMonth, SeriesOrderError, TimeSeriesPoint, TrendSeries, TrendSnapshot,
};
use crate::clock::Clock;
use crate::source::{
    decode_rows, procedures, tables, DataSource, DataSourceError, SortDirection, TableQuery,
};
use crate::state::{LoadState, StateSlot};
use crate::tenant::{require_tenant, TenantId, TenantResolutionError, TenantResolver};
use chrono::Days;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Days of history requested by a default backfill.
pub const DEFAULT_BACKFILL_DAYS: u32 = 365;

#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error(transparent)]
    Tenant(#[from] TenantResolutionError),
    #[error("failed to load trends: {0}")]
    Source(#[from] DataSourceError),
    #[error("snapshot series is not in date order: {0}")]
    OutOfOrder(#[from] SeriesOrderError),
}

impl TrendSnapshot {
    pub fn month_over_month(&self, metric: Metric) -> Option<MonthOverMonth> {
        month_over_month(self.series.points(), metric)
    }

    pub fn sparkline(&self, metric: Metric) -> Sparkline<'_> {
        Sparkline::new(self.series.points(), metric)
    }
}

/// Loads the rolling window of daily KPI snapshots and active dashboard alerts.
pub struct TrendSeriesLoader {
    source: Arc<dyn DataSource>,
    tenants: Arc<dyn TenantResolver>,
    clock: Arc<dyn Clock>,
    days: u32,
    state: StateSlot<TrendSnapshot>,
}

impl TrendSeriesLoader {
    pub fn new(
        source: Arc<dyn DataSource>,
        tenants: Arc<dyn TenantResolver>,
        clock: Arc<dyn Clock>,
        days: u32,
    ) -> Self {
        Self {
            source,
            tenants,
            clock,
            days: days.max(1),
            state: StateSlot::new(TrendSnapshot::default()),
        }
    }

    pub fn window_days(&self) -> u32 {
        self.days
    }

    /// Re-fetches series and alerts. On failure the previous snapshot stays
    /// in place and the error is recorded on the state.
    pub fn refresh(&self) -> Result<TrendSnapshot, TrendError> {
        let ticket = self.state.begin();

        let result = require_tenant(self.tenants.as_ref())
            .map_err(TrendError::from)
            .and_then(|tenant| self.load(&tenant));

        match result {
            Ok(snapshot) => {
                self.state.commit(ticket, snapshot.clone());
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "trend refresh failed");
                self.state.fail(ticket, err.to_string());
                Err(err)
            }
        }
    }

    pub fn state(&self) -> LoadState<TrendSnapshot> {
        self.state.snapshot()
    }

    pub fn snapshot(&self) -> TrendSnapshot {
        self.state.data()
    }

    /// Snapshot from the last successful refresh, if there has been one.
    pub fn last_loaded(&self) -> Option<TrendSnapshot> {
        self.state.last_loaded()
    }

    pub fn month_over_month_change(&self, metric: Metric) -> Option<MonthOverMonth> {
        self.snapshot().month_over_month(metric)
    }

    /// Asks the backend to synthesize `days` of snapshot history, then reloads.
    /// A failed backfill call is recorded on the state like a failed refresh.
    pub fn backfill_historical_data(&self, days: u32) -> Result<TrendSnapshot, TrendError> {
        let ticket = self.state.begin();
        let result = require_tenant(self.tenants.as_ref())
            .map_err(TrendError::from)
            .and_then(|tenant| {
                let inserted = self.source.rpc(
                    procedures::BACKFILL_KPIS,
                    json!({ "p_tenant": tenant.as_str(), "p_days": days }),
                )?;
                info!(%tenant, days, result = %inserted, "kpi history backfilled");
                Ok(())
            });

        if let Err(err) = result {
            warn!(error = %err, "kpi backfill failed");
            self.state.fail(ticket, err.to_string());
            return Err(err);
        }
        self.refresh()
    }

    pub fn detach(&self) {
        self.state.detach();
    }

    fn load(&self, tenant: &TenantId) -> Result<TrendSnapshot, TrendError> {
        let since = self
            .clock
            .today()
            .checked_sub_days(Days::new(u64::from(self.days)))
            .unwrap_or(chrono::NaiveDate::MIN);

        let series_query = TableQuery::from(tables::KPI_SNAPSHOTS)
            .eq("company_id", tenant.as_str())
            .gte("snap_date", since.to_string())
            .order("snap_date", SortDirection::Ascending);
        let points: Vec<TimeSeriesPoint> =
            decode_rows(&series_query.describe(), self.source.select(&series_query)?)?;
        let series = TrendSeries::new(points)?;

        let alert_query = TableQuery::from(tables::DASHBOARD_ALERTS)
            .eq("company_id", tenant.as_str())
            .order("created_at", SortDirection::Descending);
        let alerts: Vec<Alert> =
            decode_rows(&alert_query.describe(), self.source.select(&alert_query)?)?;

        debug!(%tenant, %since, points = series.len(), alerts = alerts.len(), "trend window loaded");
        Ok(TrendSnapshot { series, alerts })
    }
}
