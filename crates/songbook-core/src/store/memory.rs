//! In-process store client.
//!
//! One table, held as `partition -> (sort -> item bytes)` ordered maps with
//! MessagePack-encoded items. Writers are serialized by a `RwLock` and
//! update the table copy-on-write; readers clone the current `Arc` and
//! iterate that snapshot without holding the lock.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use super::encoding;
use super::projection::project_item;
use super::{IndexDefinition, ItemStream, Projection, StoreClient, TableSchema};
use crate::catalog::music_catalog;
use crate::error::StoreError;
use crate::query::filter::FilterExpr;
use crate::types::{CompositeKey, DEFAULT_TABLE_NAME, MAX_ITEM_SIZE, SortOrder};

type Partition = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Clone, Default)]
struct TableState {
    items: BTreeMap<String, Partition>,
    /// Index name -> entry key -> primary key.
    indexes: HashMap<String, BTreeMap<Vec<u8>, CompositeKey>>,
}

/// A [`StoreClient`] backed by process memory.
#[derive(Debug)]
pub struct MemoryStore {
    schema: TableSchema,
    state: RwLock<Arc<TableState>>,
}

impl MemoryStore {
    pub fn new(schema: TableSchema) -> Self {
        let indexes = schema
            .indexes
            .iter()
            .map(|i| (i.name.clone(), BTreeMap::new()))
            .collect();
        Self {
            schema,
            state: RwLock::new(Arc::new(TableState {
                items: BTreeMap::new(),
                indexes,
            })),
        }
    }

    /// An empty `Music` table.
    pub fn music() -> Self {
        Self::new(music_catalog().table_schema(DEFAULT_TABLE_NAME))
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.snapshot().items.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().items.is_empty()
    }

    fn snapshot(&self) -> Arc<TableState> {
        Arc::clone(&self.state.read())
    }
}

impl StoreClient for MemoryStore {
    fn put_item(&self, item: Value) -> Result<(), StoreError> {
        let key = self.schema.extract_key(&item)?;
        let bytes = encode_item(&item)?;

        let mut guard = self.state.write();
        let previous = match guard.get(&key) {
            Some(raw) => Some(decode_item(raw)?),
            None => None,
        };

        let state = Arc::make_mut(&mut *guard);
        if let Some(previous) = &previous {
            state.unindex(&self.schema, &key, previous);
        }
        state.index(&self.schema, &key, &item);
        state
            .items
            .entry(key.partition.clone())
            .or_default()
            .insert(key.sort.clone(), bytes);

        trace!(table = %self.schema.name, key = %key, replaced = previous.is_some(), "put item");
        Ok(())
    }

    fn get_item(&self, key: &CompositeKey) -> Result<Option<Value>, StoreError> {
        self.snapshot().get(key).map(decode_item).transpose()
    }

    fn delete_item(&self, key: &CompositeKey) -> Result<(), StoreError> {
        let mut guard = self.state.write();
        let Some(raw) = guard.get(key) else {
            return Ok(());
        };
        let previous = decode_item(raw)?;

        let state = Arc::make_mut(&mut *guard);
        state.unindex(&self.schema, key, &previous);
        if let Some(rows) = state.items.get_mut(&key.partition) {
            rows.remove(&key.sort);
            if rows.is_empty() {
                state.items.remove(&key.partition);
            }
        }

        trace!(table = %self.schema.name, key = %key, "deleted item");
        Ok(())
    }

    fn query_by_partition(
        &self,
        partition: &str,
        order: SortOrder,
        filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError> {
        Ok(Box::new(PartitionCursor {
            snapshot: self.snapshot(),
            partition: partition.to_string(),
            order,
            last: None,
            filter: filter.cloned(),
            done: false,
        }))
    }

    fn query_index(
        &self,
        index: &str,
        value: &Value,
        order: SortOrder,
        filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError> {
        let definition = self
            .schema
            .index(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        // Only strings and numbers are ever indexed.
        let Some(prefix) = encoding::encode_value(value) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let end = encoding::increment_bytes(&prefix);

        Ok(Box::new(IndexCursor {
            snapshot: self.snapshot(),
            index: definition.name.clone(),
            projection: definition.projection.clone(),
            key_attrs: [self.schema.partition_key.clone(), self.schema.sort_key.clone()],
            start: prefix,
            end,
            order,
            last: None,
            filter: filter.cloned(),
            done: false,
        }))
    }

    fn scan(&self, filter: Option<&FilterExpr>) -> Result<ItemStream, StoreError> {
        Ok(Box::new(ScanCursor {
            snapshot: self.snapshot(),
            last: None,
            filter: filter.cloned(),
            done: false,
        }))
    }

    fn generate_unique_value(&self) -> Result<String, StoreError> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// Table state
// ---------------------------------------------------------------------------

impl TableState {
    fn get(&self, key: &CompositeKey) -> Option<&[u8]> {
        self.items
            .get(&key.partition)?
            .get(&key.sort)
            .map(Vec::as_slice)
    }

    fn index(&mut self, schema: &TableSchema, key: &CompositeKey, item: &Value) {
        for definition in &schema.indexes {
            if let Some(entry) = index_entry(definition, key, item) {
                self.indexes
                    .entry(definition.name.clone())
                    .or_default()
                    .insert(entry, key.clone());
            }
        }
    }

    fn unindex(&mut self, schema: &TableSchema, key: &CompositeKey, item: &Value) {
        for definition in &schema.indexes {
            if let Some(entry) = index_entry(definition, key, item)
                && let Some(entries) = self.indexes.get_mut(&definition.name)
            {
                entries.remove(&entry);
            }
        }
    }

    /// The first row of `partition` after `last` in the given order.
    fn partition_next(
        &self,
        partition: &str,
        order: SortOrder,
        last: Option<&str>,
    ) -> Option<(&String, &[u8])> {
        let rows = self.items.get(partition)?;
        let row = match (order, last) {
            (SortOrder::Ascending, None) => rows.iter().next(),
            (SortOrder::Ascending, Some(last)) => rows
                .range::<str, _>((Bound::Excluded(last), Bound::Unbounded))
                .next(),
            (SortOrder::Descending, None) => rows.iter().next_back(),
            (SortOrder::Descending, Some(last)) => rows
                .range::<str, _>((Bound::Unbounded, Bound::Excluded(last)))
                .next_back(),
        };
        row.map(|(sort, bytes)| (sort, bytes.as_slice()))
    }

    /// The first row of the table after `last`, in key order.
    fn scan_next(&self, last: Option<&CompositeKey>) -> Option<(CompositeKey, &[u8])> {
        let partitions = match last {
            None => self.items.range::<str, _>(..),
            Some(last) => {
                if let Some((sort, bytes)) =
                    self.partition_next(&last.partition, SortOrder::Ascending, Some(&last.sort))
                {
                    return Some((CompositeKey::new(&last.partition, sort), bytes));
                }
                self.items
                    .range::<str, _>((Bound::Excluded(last.partition.as_str()), Bound::Unbounded))
            }
        };
        partitions
            .flat_map(|(partition, rows)| {
                rows.iter()
                    .map(move |(sort, bytes)| (CompositeKey::new(partition, sort), bytes.as_slice()))
            })
            .next()
    }
}

fn index_entry(definition: &IndexDefinition, key: &CompositeKey, item: &Value) -> Option<Vec<u8>> {
    let value = encoding::encode_value(item.get(&definition.key_attribute)?)?;
    let sort_value = match &definition.sort_attribute {
        Some(attribute) => Some(encoding::encode_value(item.get(attribute)?)?),
        None => None,
    };
    Some(encoding::entry_key(&value, sort_value.as_deref(), key))
}

fn encode_item(item: &Value) -> Result<Vec<u8>, StoreError> {
    let bytes = rmp_serde::to_vec(item).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if bytes.len() > MAX_ITEM_SIZE {
        return Err(StoreError::ItemTooLarge {
            max: MAX_ITEM_SIZE,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

fn decode_item(bytes: &[u8]) -> Result<Value, StoreError> {
    rmp_serde::from_slice(bytes).map_err(|e| StoreError::Corrupted(e.to_string()))
}

/// Decode a row and run it through the filter. `Ok(None)` means filtered out.
fn admit(bytes: &[u8], filter: Option<&FilterExpr>) -> Result<Option<Value>, StoreError> {
    let item = decode_item(bytes)?;
    match filter {
        Some(f) if !f.eval(&item)? => Ok(None),
        _ => Ok(Some(item)),
    }
}

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

struct PartitionCursor {
    snapshot: Arc<TableState>,
    partition: String,
    order: SortOrder,
    last: Option<String>,
    filter: Option<FilterExpr>,
    done: bool,
}

impl Iterator for PartitionCursor {
    type Item = Result<Value, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some((sort, bytes)) =
                self.snapshot
                    .partition_next(&self.partition, self.order, self.last.as_deref())
            else {
                self.done = true;
                break;
            };
            let sort = sort.clone();
            let result = admit(bytes, self.filter.as_ref());
            self.last = Some(sort);
            match result {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

struct ScanCursor {
    snapshot: Arc<TableState>,
    last: Option<CompositeKey>,
    filter: Option<FilterExpr>,
    done: bool,
}

impl Iterator for ScanCursor {
    type Item = Result<Value, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some((key, bytes)) = self.snapshot.scan_next(self.last.as_ref()) else {
                self.done = true;
                break;
            };
            let result = admit(bytes, self.filter.as_ref());
            self.last = Some(key);
            match result {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

struct IndexCursor {
    snapshot: Arc<TableState>,
    index: String,
    projection: Projection,
    key_attrs: [String; 2],
    /// Inclusive lower bound: the encoded indexed value.
    start: Vec<u8>,
    /// Exclusive upper bound, `None` when unbounded.
    end: Option<Vec<u8>>,
    order: SortOrder,
    last: Option<Vec<u8>>,
    filter: Option<FilterExpr>,
    done: bool,
}

impl IndexCursor {
    fn next_entry(&self) -> Option<(Vec<u8>, CompositeKey)> {
        let entries = self.snapshot.indexes.get(&self.index)?;
        let upper = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        let entry = match (self.order, &self.last) {
            (SortOrder::Ascending, None) => entries
                .range::<[u8], _>((Bound::Included(self.start.as_slice()), upper))
                .next(),
            (SortOrder::Ascending, Some(last)) => entries
                .range::<[u8], _>((Bound::Excluded(last.as_slice()), upper))
                .next(),
            (SortOrder::Descending, None) => entries
                .range::<[u8], _>((Bound::Included(self.start.as_slice()), upper))
                .next_back(),
            (SortOrder::Descending, Some(last)) => entries
                .range::<[u8], _>((
                    Bound::Included(self.start.as_slice()),
                    Bound::Excluded(last.as_slice()),
                ))
                .next_back(),
        };
        entry.map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl Iterator for IndexCursor {
    type Item = Result<Value, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some((entry, key)) = self.next_entry() else {
                self.done = true;
                break;
            };
            self.last = Some(entry);

            let result = match self.snapshot.get(&key) {
                Some(bytes) => admit(bytes, self.filter.as_ref()).map(|item| {
                    item.map(|item| {
                        let keys = [self.key_attrs[0].as_str(), self.key_attrs[1].as_str()];
                        project_item(&item, &self.projection, &keys)
                    })
                }),
                None => Err(StoreError::Corrupted(format!(
                    "index '{}' points at missing item {key}",
                    self.index
                ))),
            };
            match result {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
