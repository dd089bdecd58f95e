//! Boundary to the hosted backend. Components address tables and remote
//! procedures by name and receive loosely shaped JSON that they decode into
//! their own typed records.

mod memory;

pub use memory::MemoryDataSource;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Remote procedure names.
pub mod procedures {
    pub const HEADCOUNT: &str = "ask_headcount_v1";
    pub const BACKFILL_KPIS: &str = "dev_backfill_kpis_v1";
    pub const CCI_OVERVIEW: &str = "cci_get_overview_v1";
    pub const SESSION_MEMORY: &str = "ai_session_memory_upsert_v1";
}

/// Table names.
pub mod tables {
    pub const EMPLOYEES: &str = "hr_employees";
    pub const DEPARTMENTS: &str = "hr_departments";
    pub const KPI_SNAPSHOTS: &str = "kpi_snapshots";
    pub const DASHBOARD_ALERTS: &str = "dashboard_alerts";
}

/// Query/RPC interface of the hosted backend.
pub trait DataSource: Send + Sync {
    fn rpc(&self, procedure: &str, params: Value) -> Result<Value, DataSourceError>;
    fn select(&self, query: &TableQuery) -> Result<Vec<Value>, DataSourceError>;
}

impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    fn rpc(&self, procedure: &str, params: Value) -> Result<Value, DataSourceError> {
        (**self).rpc(procedure, params)
    }

    fn select(&self, query: &TableQuery) -> Result<Vec<Value>, DataSourceError> {
        (**self).select(query)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("{operation} failed: {message}")]
    Remote { operation: String, message: String },
    #[error("{operation} returned an unexpected shape: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

impl DataSourceError {
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    Gte { column: String, value: Value },
    In { column: String, values: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// Table read expressed the way the hosted query builder composes it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn in_list(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values,
        });
        self
    }

    pub fn order(mut self, column: &str, direction: SortDirection) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn describe(&self) -> String {
        format!("select {} from {}", self.columns, self.table)
    }
}

/// Decodes rows into typed records, naming the operation on failure.
pub fn decode_rows<T: DeserializeOwned>(
    operation: &str,
    rows: Vec<Value>,
) -> Result<Vec<T>, DataSourceError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|source| DataSourceError::Decode {
                operation: operation.to_string(),
                source,
            })
        })
        .collect()
}

/// Procedures declared `returns table` answer with an array; unwrap the first
/// row so callers see a single object. `null` and `[]` mean "no result".
pub fn first_row(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(rows) => rows.into_iter().next().filter(|row| !row.is_null()),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_row_unwraps_table_results() {
        assert_eq!(first_row(json!([{ "a": 1 }, { "a": 2 }])), Some(json!({ "a": 1 })));
        assert_eq!(first_row(json!({ "a": 1 })), Some(json!({ "a": 1 })));
        assert_eq!(first_row(json!([])), None);
        assert_eq!(first_row(Value::Null), None);
    }

    #[test]
    fn decode_failures_name_the_operation() {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            #[allow(dead_code)]
            id: String,
        }

        let err = decode_rows::<Row>("select * from hr_employees", vec![json!({ "id": 5 })])
            .expect_err("numeric id must not decode as string");
        assert!(err.to_string().starts_with("select * from hr_employees"));
    }
}
