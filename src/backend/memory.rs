//! Reference backend over in-memory rows.
//!
//! Loads run the full pipeline a storage engine would: filter, stable sort, projection,
//! distinct, then offset and limit. Every specification received is recorded so callers
//! can inspect what a repository method asked for.

use crate::backend::eval;
use crate::backend::LoadBackend;
use crate::error::BackendError;
use crate::query::spec::LoadSpecification;
use crate::value::Row;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: BTreeMap<String, Vec<Row>>,
    /// Rows served for literal query text.
    text_results: BTreeMap<String, Vec<Row>>,
    received: Arc<Mutex<Vec<LoadSpecification>>>,
    rows_scanned: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds rows to the table of `entity`.
    pub fn with_rows(mut self, entity: impl Into<String>, rows: impl IntoIterator<Item = Row>) -> Self {
        self.tables.entry(entity.into()).or_default().extend(rows);
        self
    }

    /// Serves `rows` for loads whose query text is exactly `text`.
    pub fn with_text_result(mut self, text: impl Into<String>, rows: impl IntoIterator<Item = Row>) -> Self {
        self.text_results.insert(text.into(), rows.into_iter().collect());
        self
    }

    /// Specifications received so far, in arrival order.
    pub fn received(&self) -> Vec<LoadSpecification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Handle to the received specifications that outlives the backend.
    pub fn received_handle(&self) -> Arc<Mutex<Vec<LoadSpecification>>> {
        Arc::clone(&self.received)
    }

    /// Rows tested against a condition since construction.
    pub fn rows_scanned(&self) -> usize {
        self.rows_scanned.load(Ordering::Relaxed)
    }

    fn record(&self, spec: &LoadSpecification) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec.clone());
    }

    fn source(&self, spec: &LoadSpecification) -> Result<&[Row], BackendError> {
        match &spec.query_text {
            Some(text) => self
                .text_results
                .get(text)
                .map(Vec::as_slice)
                .ok_or_else(|| BackendError::new(format!("no result registered for query text `{text}`"))),
            None => Ok(self.tables.get(&spec.entity).map(Vec::as_slice).unwrap_or(&[])),
        }
    }

    fn is_match(&self, spec: &LoadSpecification, row: &Row) -> Result<bool, BackendError> {
        self.rows_scanned.fetch_add(1, Ordering::Relaxed);
        for condition in &spec.conditions {
            if !eval::matches(condition, row, &spec.parameters)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn shape(spec: &LoadSpecification, row: &Row) -> Row {
        if !spec.properties.is_empty() {
            return row.project(&spec.properties);
        }
        match &spec.fetch_plan {
            Some(plan) if !plan.properties.is_empty() => row.project(&plan.properties),
            _ => row.clone(),
        }
    }

    /// Equality key for distinct loads: the row's JSON form. Rows hold floats and have no
    /// `Hash`.
    fn distinct_key(row: &Row) -> Result<String, BackendError> {
        serde_json::to_string(row).map_err(|e| BackendError::with_source("row has no distinct key", e))
    }
}

impl LoadBackend for InMemoryBackend {
    fn execute(&self, spec: &LoadSpecification) -> Result<Vec<Row>, BackendError> {
        self.record(spec);
        let mut rows = Vec::new();
        for row in self.source(spec)? {
            if self.is_match(spec, row)? {
                rows.push(row.clone());
            }
        }
        rows.sort_by(|a, b| eval::compare_rows(a, b, &spec.sort));

        let mut seen = HashSet::new();
        let mut shaped: Vec<Row> = Vec::with_capacity(rows.len());
        for row in &rows {
            let row = Self::shape(spec, row);
            if spec.distinct && !seen.insert(Self::distinct_key(&row)?) {
                continue;
            }
            shaped.push(row);
        }

        let offset = usize::try_from(spec.pagination.offset).unwrap_or(usize::MAX);
        let limit = spec
            .pagination
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let rows: Vec<Row> = shaped.into_iter().skip(offset).take(limit).collect();
        log::debug!("in-memory load of `{}` returned {} row(s)", spec.entity, rows.len());
        Ok(rows)
    }

    fn count(&self, spec: &LoadSpecification) -> Result<u64, BackendError> {
        self.record(spec);
        let limit = spec.pagination.limit;
        let mut seen = HashSet::new();
        let mut count = 0u64;
        for row in self.source(spec)? {
            if limit.is_some_and(|l| count >= l) {
                break;
            }
            if !self.is_match(spec, row)? {
                continue;
            }
            if spec.distinct {
                if !seen.insert(Self::distinct_key(&Self::shape(spec, row))?) {
                    continue;
                }
            }
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::condition::{Condition, Operator};
    use crate::query::spec::{FetchPlan, LoadMode, Order, Pagination};
    use crate::value::Value;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new().with_rows(
            "Order",
            vec![
                Row::new().with("id", 1).with("status", "open").with("total", 30),
                Row::new().with("id", 2).with("status", "closed").with("total", 10),
                Row::new().with("id", 3).with("status", "open").with("total", 20),
                Row::new().with("id", 4).with("status", "open").with("total", 20),
            ],
        )
    }

    fn open_orders() -> LoadSpecification {
        let mut spec = LoadSpecification::new("Order");
        spec.conditions
            .push(Arc::new(Condition::leaf("status", Operator::Equal, ["status"])));
        spec.parameters.insert("status".into(), Value::from("open"));
        spec
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r.try_get::<i64>("id").unwrap()).collect()
    }

    #[test]
    fn test_filter_sort_and_paginate() {
        let backend = backend();
        let mut spec = open_orders();
        spec.sort = vec![Order::asc("total"), Order::desc("id")];
        assert_eq!(ids(&backend.execute(&spec).unwrap()), vec![4, 3, 1]);

        spec.pagination = Pagination {
            offset: 1,
            limit: Some(1),
        };
        assert_eq!(ids(&backend.execute(&spec).unwrap()), vec![3]);
        assert_eq!(backend.received().len(), 2);
    }

    #[test]
    fn test_received_handle_outlives_backend() {
        let backend = backend();
        let handle = backend.received_handle();
        backend.execute(&open_orders()).unwrap();
        backend.count(&open_orders().to_count()).unwrap();
        drop(backend);

        let received = handle.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].mode, LoadMode::Rows);
        assert_eq!(received[1].mode, LoadMode::Count);
    }

    #[test]
    fn test_distinct_after_projection() {
        let backend = backend();
        let mut spec = open_orders();
        spec.properties = vec!["total".into()];
        spec.distinct = true;
        spec.sort = vec![Order::asc("total")];
        let rows = backend.execute(&spec).unwrap();
        let totals: Vec<i64> = rows.iter().map(|r| r.try_get::<i64>("total").unwrap()).collect();
        assert_eq!(totals, vec![20, 30]);
    }

    #[test]
    fn test_fetch_plan_projection() {
        let backend = backend();
        let mut spec = open_orders();
        spec.fetch_plan = Some(FetchPlan::named("ids").with_properties(["id"]));
        let rows = backend.execute(&spec).unwrap();
        assert!(rows.iter().all(|r| r.len() == 1 && r.get("id").is_some()));
    }

    #[test]
    fn test_distinct_count_matches_projected_load() {
        let backend = backend();
        let mut spec = open_orders();
        spec.fetch_plan = Some(FetchPlan::named("summary").with_properties(["status"]));
        spec.distinct = true;
        assert_eq!(backend.execute(&spec).unwrap().len(), 1);
        assert_eq!(backend.count(&spec.to_count()).unwrap(), 1);
    }

    #[test]
    fn test_count_stops_at_limit() {
        let backend = backend();
        let mut spec = open_orders().to_count();
        assert_eq!(spec.mode, LoadMode::Count);
        assert_eq!(backend.count(&spec).unwrap(), 3);
        let scanned = backend.rows_scanned();

        spec.pagination.limit = Some(1);
        assert_eq!(backend.count(&spec).unwrap(), 1);
        assert_eq!(backend.rows_scanned() - scanned, 1);
    }

    #[test]
    fn test_text_queries_use_canned_results() {
        let backend = InMemoryBackend::new()
            .with_text_result("select o from Order o", vec![Row::new().with("id", 9)]);
        let mut spec = LoadSpecification::new("Order");
        spec.query_text = Some("select o from Order o".into());
        assert_eq!(ids(&backend.execute(&spec).unwrap()), vec![9]);

        spec.query_text = Some("select x".into());
        assert!(backend.execute(&spec).is_err());
    }
}
