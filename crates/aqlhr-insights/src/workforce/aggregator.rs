use super::domain::{
    DepartmentRow, DirectoryEntry, DirectoryRow, EmployeeRecord, EmploymentStatus,
    HeadcountAggregate, HeadcountSummary, WorkforceSnapshot,
};
use crate::source::{
    decode_rows, first_row, procedures, tables, DataSource, DataSourceError, SortDirection,
    TableQuery,
};
use crate::state::{LoadState, StateSlot};
use crate::tenant::{require_tenant, TenantId, TenantResolutionError, TenantResolver};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on the directory listing shown alongside the headcount.
pub const DIRECTORY_LIMIT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum WorkforceError {
    #[error(transparent)]
    Tenant(#[from] TenantResolutionError),
    #[error("failed to load headcount: {0}")]
    Source(#[from] DataSourceError),
}

/// Computes the tenant's headcount and localization share.
pub struct EmployeeAggregator {
    source: Arc<dyn DataSource>,
    tenants: Arc<dyn TenantResolver>,
    state: StateSlot<WorkforceSnapshot>,
}

impl EmployeeAggregator {
    pub fn new(source: Arc<dyn DataSource>, tenants: Arc<dyn TenantResolver>) -> Self {
        Self {
            source,
            tenants,
            state: StateSlot::new(WorkforceSnapshot::default()),
        }
    }

    /// Re-fetches the aggregate and directory, replacing the stored snapshot.
    pub fn refresh(&self) -> Result<WorkforceSnapshot, WorkforceError> {
        let ticket = self.state.begin();

        let result = require_tenant(self.tenants.as_ref())
            .map_err(WorkforceError::from)
            .and_then(|tenant| self.load(&tenant));

        match result {
            Ok(snapshot) => {
                self.state.commit(ticket, snapshot.clone());
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "workforce refresh failed");
                self.state.fail(ticket, err.to_string());
                Err(err)
            }
        }
    }

    pub fn state(&self) -> LoadState<WorkforceSnapshot> {
        self.state.snapshot()
    }

    pub fn summary(&self) -> HeadcountSummary {
        self.state.data().summary
    }

    /// Snapshot from the last successful refresh, if there has been one.
    pub fn last_loaded(&self) -> Option<WorkforceSnapshot> {
        self.state.last_loaded()
    }

    /// Drops results of fetches still in flight.
    pub fn detach(&self) {
        self.state.detach();
    }

    fn load(&self, tenant: &TenantId) -> Result<WorkforceSnapshot, WorkforceError> {
        let summary = self.headcount(tenant)?;
        let directory = match self.directory(tenant) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%tenant, error = %err, "employee directory unavailable");
                Vec::new()
            }
        };

        info!(
            %tenant,
            total_active = summary.total_active,
            localization_pct = summary.localization_pct,
            directory = directory.len(),
            "workforce snapshot refreshed"
        );

        Ok(WorkforceSnapshot { summary, directory })
    }

    fn headcount(&self, tenant: &TenantId) -> Result<HeadcountSummary, WorkforceError> {
        let aggregate = self
            .source
            .rpc(procedures::HEADCOUNT, json!({ "p_tenant": tenant.as_str() }))?;

        let usable = first_row(aggregate)
            .and_then(|row| serde_json::from_value::<HeadcountAggregate>(row).ok())
            .and_then(|aggregate| aggregate.usable());

        match usable {
            Some(summary) => Ok(summary),
            None => {
                debug!(%tenant, "headcount procedure returned nothing usable, counting records");
                let query = TableQuery::from(tables::EMPLOYEES)
                    .select("id, is_saudi, status, department_id")
                    .eq("company_id", tenant.as_str())
                    .eq("status", EmploymentStatus::Active.label());
                let rows = self.source.select(&query)?;
                let records: Vec<EmployeeRecord> = decode_rows(&query.describe(), rows)?;
                Ok(HeadcountSummary::from_records(&records))
            }
        }
    }

    fn directory(&self, tenant: &TenantId) -> Result<Vec<DirectoryEntry>, DataSourceError> {
        let query = TableQuery::from(tables::EMPLOYEES)
            .select("id, first_name, last_name, is_saudi, department_id")
            .eq("company_id", tenant.as_str())
            .eq("status", EmploymentStatus::Active.label())
            .order("last_name", SortDirection::Ascending)
            .limit(DIRECTORY_LIMIT);
        let rows: Vec<DirectoryRow> = decode_rows(&query.describe(), self.source.select(&query)?)?;

        let department_names = self.department_names(tenant, &rows);

        Ok(rows
            .into_iter()
            .take(DIRECTORY_LIMIT)
            .map(|row| DirectoryEntry {
                full_name: row.full_name(),
                department_name: row
                    .department_id
                    .as_ref()
                    .and_then(|id| department_names.get(id).cloned()),
                is_local_national: row.is_saudi,
                id: row.id,
            })
            .collect())
    }

    fn department_names(&self, tenant: &TenantId, rows: &[DirectoryRow]) -> HashMap<String, String> {
        let mut ids: Vec<Value> = rows
            .iter()
            .filter_map(|row| row.department_id.clone())
            .map(Value::String)
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
        ids.dedup();
        if ids.is_empty() {
            return HashMap::new();
        }

        let query = TableQuery::from(tables::DEPARTMENTS)
            .select("id, name")
            .eq("company_id", tenant.as_str())
            .in_list("id", ids);
        let departments = self
            .source
            .select(&query)
            .and_then(|rows| decode_rows::<DepartmentRow>(&query.describe(), rows));

        match departments {
            Ok(departments) => departments
                .into_iter()
                .map(|department| (department.id, department.name))
                .collect(),
            Err(err) => {
                warn!(%tenant, error = %err, "department names unavailable");
                HashMap::new()
            }
        }
    }
}
