use super::{DataSource, DataSourceError, Filter, SortDirection, TableQuery};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

type ProcedureHandler = Arc<dyn Fn(&Value) -> Result<Value, DataSourceError> + Send + Sync>;

/// In-process backend used by the demo service and the test suites. Tables
/// hold raw JSON rows; procedures are closures over the request params.
#[derive(Default, Clone)]
pub struct MemoryDataSource {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    procedures: Arc<Mutex<HashMap<String, ProcedureHandler>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl fmt::Debug for MemoryDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDataSource").finish_non_exhaustive()
    }
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_rows(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut guard = self.tables.lock().expect("table mutex poisoned");
        guard.entry(table.to_string()).or_default().extend(rows);
    }

    pub fn replace_rows(&self, table: &str, rows: Vec<Value>) {
        let mut guard = self.tables.lock().expect("table mutex poisoned");
        guard.insert(table.to_string(), rows);
    }

    pub fn register_procedure<F>(&self, name: &str, handler: F)
    where
        F: Fn(&Value) -> Result<Value, DataSourceError> + Send + Sync + 'static,
    {
        let mut guard = self.procedures.lock().expect("procedure mutex poisoned");
        guard.insert(name.to_string(), Arc::new(handler));
    }

    /// Makes every call against `target` (table or procedure) fail.
    pub fn fail(&self, target: &str, message: &str) {
        let mut guard = self.failures.lock().expect("failure mutex poisoned");
        guard.insert(target.to_string(), message.to_string());
    }

    pub fn recover(&self, target: &str) {
        let mut guard = self.failures.lock().expect("failure mutex poisoned");
        guard.remove(target);
    }

    /// Names of tables and procedures hit so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }

    fn record(&self, target: &str) -> Result<(), DataSourceError> {
        self.calls
            .lock()
            .expect("call mutex poisoned")
            .push(target.to_string());
        let failures = self.failures.lock().expect("failure mutex poisoned");
        match failures.get(target) {
            Some(message) => Err(DataSourceError::remote(target, message.clone())),
            None => Ok(()),
        }
    }
}

impl DataSource for MemoryDataSource {
    fn rpc(&self, procedure: &str, params: Value) -> Result<Value, DataSourceError> {
        self.record(procedure)?;
        let handler = {
            let guard = self.procedures.lock().expect("procedure mutex poisoned");
            guard.get(procedure).cloned()
        };
        match handler {
            Some(handler) => handler(&params),
            None => Err(DataSourceError::remote(
                procedure,
                "function does not exist",
            )),
        }
    }

    fn select(&self, query: &TableQuery) -> Result<Vec<Value>, DataSourceError> {
        self.record(&query.table)?;
        let guard = self.tables.lock().expect("table mutex poisoned");
        let mut rows: Vec<Value> = guard
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|filter| matches(row, filter)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(guard);

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(&a[order.column.as_str()], &b[order.column.as_str()]);
                match order.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => &row[column.as_str()] == value,
        Filter::Gte { column, value } => {
            compare(&row[column.as_str()], value) != Ordering::Less
                && !row[column.as_str()].is_null()
        }
        Filter::In { column, values } => values.contains(&row[column.as_str()]),
    }
}

fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
