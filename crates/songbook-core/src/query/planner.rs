//! Query planner: predicate -> access path -> store operation.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{AccessPath, AccessPathCatalog, KeyCoverage};
use crate::error::{Error, QueryError, StoreError};
use crate::key;
use crate::store::{ItemStream, StoreClient};
use crate::types::{CompositeKey, SortOrder};

use super::filter::FilterExpr;
use super::predicate::Predicate;

/// A store operation ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedOperation {
    /// Single-item lookup by full key.
    GetItem {
        key: CompositeKey,
        filter: Option<FilterExpr>,
    },
    /// Every item in one partition, ordered by sort key.
    QueryPartition {
        partition: String,
        order: SortOrder,
        filter: Option<FilterExpr>,
    },
    /// Items with `value` in a secondary index, reduced to its projection.
    QueryIndex {
        index: String,
        value: Value,
        order: SortOrder,
        filter: Option<FilterExpr>,
    },
    /// Full-table scan.
    Scan { filter: Option<FilterExpr> },
}

impl PlannedOperation {
    /// The access path name used in log events.
    pub fn access_path(&self) -> &'static str {
        match self {
            PlannedOperation::GetItem { .. } => "key",
            PlannedOperation::QueryPartition { .. } => "partition",
            PlannedOperation::QueryIndex { .. } => "index",
            PlannedOperation::Scan { .. } => "scan",
        }
    }

    pub fn filter(&self) -> Option<&FilterExpr> {
        match self {
            PlannedOperation::GetItem { filter, .. }
            | PlannedOperation::QueryPartition { filter, .. }
            | PlannedOperation::QueryIndex { filter, .. }
            | PlannedOperation::Scan { filter } => filter.as_ref(),
        }
    }
}

impl fmt::Display for PlannedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedOperation::GetItem { key, .. } => {
                write!(f, "GET_ITEM {}", key)?;
            }
            PlannedOperation::QueryPartition {
                partition, order, ..
            } => {
                write!(f, "QUERY PARTITION {partition:?} ORDER {order}")?;
            }
            PlannedOperation::QueryIndex {
                index,
                value,
                order,
                ..
            } => {
                write!(f, "QUERY INDEX {index} = {value} ORDER {order}")?;
            }
            PlannedOperation::Scan { .. } => {
                write!(f, "SCAN")?;
            }
        }
        if let Some(filter) = self.filter() {
            write!(f, " FILTER {filter}")?;
        }
        Ok(())
    }
}

/// Plans and executes predicates against one catalog.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    catalog: Arc<AccessPathCatalog>,
    scan_enabled: bool,
}

impl QueryPlanner {
    pub fn new(catalog: Arc<AccessPathCatalog>) -> Self {
        Self {
            catalog,
            scan_enabled: true,
        }
    }

    /// Allow or refuse predicates that need a full table scan.
    pub fn scan_enabled(mut self, enabled: bool) -> Self {
        self.scan_enabled = enabled;
        self
    }

    pub fn catalog(&self) -> &AccessPathCatalog {
        &self.catalog
    }

    /// Turn a predicate into a store operation. Nothing touches the store.
    pub fn plan(&self, predicate: &Predicate) -> Result<PlannedOperation, Error> {
        let path = self.catalog.resolve(predicate)?;
        self.check_values(predicate, &path)?;

        let order = predicate.ordering().map(|o| o.order).unwrap_or_default();
        let pk = self.catalog.partition_key();
        let sk = self.catalog.sort_key();

        let op = match path {
            AccessPath::PrimaryKey(KeyCoverage::Full) => PlannedOperation::GetItem {
                key: key::encode(bound_str(predicate, pk)?, bound_str(predicate, sk)?)?,
                filter: residual_filter(predicate, &[pk, sk]),
            },
            AccessPath::PrimaryKey(KeyCoverage::Partition) => PlannedOperation::QueryPartition {
                partition: bound_str(predicate, pk)?.to_string(),
                order,
                filter: residual_filter(predicate, &[pk]),
            },
            AccessPath::Index(index) => PlannedOperation::QueryIndex {
                value: bound(predicate, &index.key_attribute)?.clone(),
                filter: residual_filter(predicate, &[index.key_attribute.as_str()]),
                index: index.name,
                order,
            },
            AccessPath::Scan => {
                self.check_scan()?;
                PlannedOperation::Scan {
                    filter: residual_filter(predicate, &[]),
                }
            }
        };
        Ok(op)
    }

    /// An unfiltered full-table scan, subject to the scan setting.
    pub fn plan_scan(&self) -> Result<PlannedOperation, Error> {
        self.check_scan()?;
        Ok(PlannedOperation::Scan { filter: None })
    }

    /// Run a planned operation. The returned stream is lazy.
    pub fn execute<S: StoreClient + ?Sized>(
        &self,
        store: &S,
        op: &PlannedOperation,
    ) -> Result<ItemStream, Error> {
        let stream: ItemStream = match op {
            PlannedOperation::GetItem { key, filter } => {
                debug!(access_path = "key", key = %key, "get item");
                let item = match store.get_item(key)? {
                    Some(item) => match filter {
                        Some(f) if !f.eval(&item).map_err(StoreError::from)? => None,
                        _ => Some(item),
                    },
                    None => None,
                };
                Box::new(item.into_iter().map(Ok))
            }
            PlannedOperation::QueryPartition {
                partition,
                order,
                filter,
            } => {
                debug!(access_path = "partition", partition = %partition, order = %order, "query partition");
                store.query_by_partition(partition, *order, filter.as_ref())?
            }
            PlannedOperation::QueryIndex {
                index,
                value,
                order,
                filter,
            } => {
                debug!(access_path = "index", index = %index, value = %value, "query index");
                store.query_index(index, value, *order, filter.as_ref())?
            }
            PlannedOperation::Scan { filter } => {
                match filter {
                    Some(f) => info!(access_path = "scan", filter = %f, "full table scan"),
                    None => info!(access_path = "scan", "full table scan"),
                }
                store.scan(filter.as_ref())?
            }
        };
        Ok(stream)
    }

    fn check_scan(&self) -> Result<(), QueryError> {
        if self.scan_enabled {
            Ok(())
        } else {
            Err(QueryError::ScanDisabled)
        }
    }

    /// Key attributes take strings, index keys strings or numbers, and
    /// everything else a scalar.
    fn check_values(&self, predicate: &Predicate, path: &AccessPath) -> Result<(), QueryError> {
        for condition in predicate.conditions() {
            let attribute = condition.attribute.as_str();
            let value = &condition.value;
            let expected = if attribute == self.catalog.partition_key()
                || attribute == self.catalog.sort_key()
            {
                value.is_string().then_some(()).ok_or("a string")
            } else if matches!(path, AccessPath::Index(index) if index.key_attribute == attribute) {
                (value.is_string() || value.is_number())
                    .then_some(())
                    .ok_or("a string or number")
            } else {
                (!value.is_array() && !value.is_object() && !value.is_null())
                    .then_some(())
                    .ok_or("a scalar value")
            };
            expected.map_err(|expected| QueryError::InvalidValue {
                attribute: attribute.to_string(),
                expected,
            })?;
        }
        Ok(())
    }
}

fn bound<'a>(predicate: &'a Predicate, attribute: &str) -> Result<&'a Value, QueryError> {
    predicate
        .value_of(attribute)
        .ok_or_else(|| QueryError::UnknownAttribute(attribute.to_string()))
}

fn bound_str<'a>(predicate: &'a Predicate, attribute: &str) -> Result<&'a str, QueryError> {
    bound(predicate, attribute)?
        .as_str()
        .ok_or_else(|| QueryError::InvalidValue {
            attribute: attribute.to_string(),
            expected: "a string",
        })
}

/// Equality filter over every condition the access path does not consume.
fn residual_filter(predicate: &Predicate, consumed: &[&str]) -> Option<FilterExpr> {
    let mut exprs: Vec<FilterExpr> = predicate
        .conditions()
        .iter()
        .filter(|c| !consumed.contains(&c.attribute.as_str()))
        .map(|c| FilterExpr::attr_eq(c.attribute.clone(), c.value.clone()))
        .collect();
    match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(FilterExpr::and(exprs)),
    }
}
