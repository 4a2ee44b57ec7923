//! The store client boundary.
//!
//! The repository talks to the underlying wide-column store only through
//! [`StoreClient`]. Items cross the boundary as JSON objects; result sets
//! come back as lazy [`ItemStream`]s.

mod encoding;
pub mod memory;
mod projection;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::query::filter::FilterExpr;
use crate::types::{CompositeKey, SortOrder};

pub use memory::MemoryStore;
pub use projection::project_item;

/// A lazy, finite, single-pass sequence of raw items.
pub type ItemStream = Box<dyn Iterator<Item = Result<Value, StoreError>> + Send>;

/// Attributes a secondary index carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Table keys only.
    KeysOnly,
    /// Table keys plus the listed attributes.
    Include(Vec<String>),
    /// The whole item.
    All,
}

/// A secondary index declared on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub key_attribute: String,
    pub sort_attribute: Option<String>,
    pub projection: Projection,
}

/// Store-side description of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub partition_key: String,
    pub sort_key: String,
    pub indexes: Vec<IndexDefinition>,
}

impl TableSchema {
    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn key_attributes(&self) -> [&str; 2] {
        [&self.partition_key, &self.sort_key]
    }

    /// Read the composite key out of an item.
    pub fn extract_key(&self, item: &Value) -> Result<CompositeKey, StoreError> {
        let obj = item.as_object().ok_or(StoreError::NotAnObject)?;
        let part = |name: &str| {
            obj.get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| StoreError::MissingKeyAttribute(name.to_string()))
        };
        Ok(CompositeKey::new(
            part(&self.partition_key)?,
            part(&self.sort_key)?,
        ))
    }
}

/// Operations the repository needs from a wide-column store.
///
/// Implementations own connection pooling, retries and throttling. Errors
/// are passed through to callers unmodified.
pub trait StoreClient: Send + Sync {
    /// Insert or replace the item with the same composite key.
    fn put_item(&self, item: Value) -> Result<(), StoreError>;

    fn get_item(&self, key: &CompositeKey) -> Result<Option<Value>, StoreError>;

    /// Remove an item. Deleting a missing key succeeds.
    fn delete_item(&self, key: &CompositeKey) -> Result<(), StoreError>;

    /// Every item in one partition, ordered by sort key.
    fn query_by_partition(
        &self,
        partition: &str,
        order: SortOrder,
        filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError>;

    /// Items whose index key equals `value`, reduced to the index projection.
    fn query_index(
        &self,
        index: &str,
        value: &Value,
        order: SortOrder,
        filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError>;

    /// Every item in the table.
    fn scan(&self, filter: Option<&FilterExpr>) -> Result<ItemStream, StoreError>;

    /// A fresh value for generated partition keys and surrogate ids.
    fn generate_unique_value(&self) -> Result<String, StoreError>;
}

macro_rules! forward_store_client {
    ($ty:ty) => {
        impl<T: StoreClient + ?Sized> StoreClient for $ty {
            fn put_item(&self, item: Value) -> Result<(), StoreError> {
                (**self).put_item(item)
            }

            fn get_item(&self, key: &CompositeKey) -> Result<Option<Value>, StoreError> {
                (**self).get_item(key)
            }

            fn delete_item(&self, key: &CompositeKey) -> Result<(), StoreError> {
                (**self).delete_item(key)
            }

            fn query_by_partition(
                &self,
                partition: &str,
                order: SortOrder,
                filter: Option<&FilterExpr>,
            ) -> Result<ItemStream, StoreError> {
                (**self).query_by_partition(partition, order, filter)
            }

            fn query_index(
                &self,
                index: &str,
                value: &Value,
                order: SortOrder,
                filter: Option<&FilterExpr>,
            ) -> Result<ItemStream, StoreError> {
                (**self).query_index(index, value, order, filter)
            }

            fn scan(&self, filter: Option<&FilterExpr>) -> Result<ItemStream, StoreError> {
                (**self).scan(filter)
            }

            fn generate_unique_value(&self) -> Result<String, StoreError> {
                (**self).generate_unique_value()
            }
        }
    };
}

forward_store_client!(&T);
forward_store_client!(Arc<T>);
forward_store_client!(Box<T>);
