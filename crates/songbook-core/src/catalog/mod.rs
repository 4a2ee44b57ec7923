//! Access path catalog: which attributes the primary key and each secondary
//! index can serve, and which predicates fall back to a scan.
//!
//! A catalog is built once and shared read-only (`Arc<AccessPathCatalog>`).

mod builder;

use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::query::predicate::{OrderBy, Predicate};
use crate::store::{IndexDefinition, Projection, TableSchema};
use crate::types::{YEAR_INDEX, attr};

pub use builder::CatalogBuilder;

/// A declared secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPath {
    pub name: String,
    /// Attribute the index is partitioned on.
    pub key_attribute: String,
    /// Attribute results can be ordered by, if the index declares one.
    pub sort_attribute: Option<String>,
    /// Attributes an index query returns. Table keys are always returned.
    pub projected_fields: Vec<String>,
}

impl IndexPath {
    pub fn new(name: impl Into<String>, key_attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_attribute: key_attribute.into(),
            sort_attribute: None,
            projected_fields: Vec::new(),
        }
    }

    pub fn sort_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.sort_attribute = Some(attribute.into());
        self
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projected_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// How much of the primary key a predicate binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCoverage {
    /// Partition and sort key: a single-item lookup.
    Full,
    /// Partition key only: a range over one partition.
    Partition,
}

/// The retrieval strategy chosen for a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    PrimaryKey(KeyCoverage),
    Index(IndexPath),
    Scan,
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPath::PrimaryKey(KeyCoverage::Full) => write!(f, "PRIMARY_KEY"),
            AccessPath::PrimaryKey(KeyCoverage::Partition) => write!(f, "PRIMARY_KEY(partition)"),
            AccessPath::Index(index) => write!(f, "INDEX({})", index.name),
            AccessPath::Scan => write!(f, "SCAN"),
        }
    }
}

/// What a single attribute is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeRoute<'a> {
    PartitionKey,
    SortKey,
    Indexed(&'a IndexPath),
    Unindexed,
}

/// Static description of the access paths of one entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPathCatalog {
    pub(crate) partition_key: String,
    pub(crate) sort_key: String,
    /// Non-key attributes that predicates may reference.
    pub(crate) attributes: Vec<String>,
    pub(crate) indexes: Vec<IndexPath>,
}

static MUSIC_CATALOG: LazyLock<Arc<AccessPathCatalog>> =
    LazyLock::new(|| Arc::new(AccessPathCatalog::music()));

/// The process-wide `Music` catalog.
pub fn music_catalog() -> Arc<AccessPathCatalog> {
    Arc::clone(&MUSIC_CATALOG)
}

impl AccessPathCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The `Music` table: `artist`/`songTitle` primary key and a
    /// keys-only `year-index`. `genre`, `quality` and `albumTitle` have
    /// no index and are served by scans.
    pub fn music() -> Self {
        Self {
            partition_key: attr::ARTIST.to_string(),
            sort_key: attr::SONG_TITLE.to_string(),
            attributes: [
                attr::ID,
                attr::ALBUM_TITLE,
                attr::GENRE,
                attr::YEAR,
                attr::QUALITY,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            indexes: vec![
                IndexPath::new(YEAR_INDEX, attr::YEAR).project([attr::ARTIST, attr::SONG_TITLE]),
            ],
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    pub fn indexes(&self) -> &[IndexPath] {
        &self.indexes
    }

    /// Classify a single attribute.
    pub fn route(&self, attribute: &str) -> Result<AttributeRoute<'_>, QueryError> {
        if attribute == self.partition_key {
            return Ok(AttributeRoute::PartitionKey);
        }
        if attribute == self.sort_key {
            return Ok(AttributeRoute::SortKey);
        }
        if let Some(index) = self.indexes.iter().find(|i| i.key_attribute == attribute) {
            return Ok(AttributeRoute::Indexed(index));
        }
        if self.attributes.iter().any(|a| a == attribute) {
            return Ok(AttributeRoute::Unindexed);
        }
        Err(QueryError::UnknownAttribute(attribute.to_string()))
    }

    /// Pick the access path for a predicate.
    ///
    /// Orderings are checked here, so an unsupported ordering is rejected
    /// before anything reaches the store.
    pub fn resolve(&self, predicate: &Predicate) -> Result<AccessPath, QueryError> {
        let conditions = predicate.conditions();
        if conditions.is_empty() {
            return Err(QueryError::EmptyPredicate);
        }

        for (i, condition) in conditions.iter().enumerate() {
            self.route(&condition.attribute)?;
            if conditions[..i]
                .iter()
                .any(|c| c.attribute == condition.attribute)
            {
                return Err(QueryError::DuplicateAttribute(condition.attribute.clone()));
            }
        }

        let path = if predicate.binds(&self.partition_key) {
            if predicate.binds(&self.sort_key) {
                AccessPath::PrimaryKey(KeyCoverage::Full)
            } else {
                AccessPath::PrimaryKey(KeyCoverage::Partition)
            }
        } else if let Some(index) = self.covering_index(predicate) {
            AccessPath::Index(index.clone())
        } else {
            AccessPath::Scan
        };

        if let Some(order) = predicate.ordering() {
            self.check_ordering(&path, order)?;
        }

        Ok(path)
    }

    /// The first index whose key is bound and whose returned attributes
    /// cover every other condition.
    fn covering_index(&self, predicate: &Predicate) -> Option<&IndexPath> {
        self.indexes.iter().find(|index| {
            predicate.binds(&index.key_attribute)
                && predicate
                    .conditions()
                    .iter()
                    .all(|c| self.index_returns(index, &c.attribute))
        })
    }

    fn index_returns(&self, index: &IndexPath, attribute: &str) -> bool {
        attribute == index.key_attribute
            || index.sort_attribute.as_deref() == Some(attribute)
            || attribute == self.partition_key
            || attribute == self.sort_key
            || index.projected_fields.iter().any(|f| f == attribute)
    }

    fn check_ordering(&self, path: &AccessPath, order: &OrderBy) -> Result<(), QueryError> {
        self.route(&order.attribute)?;
        let allowed = match path {
            AccessPath::PrimaryKey(_) => order.attribute == self.sort_key,
            AccessPath::Index(index) => index.sort_attribute.as_deref() == Some(&order.attribute),
            AccessPath::Scan => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(QueryError::OrderingNotSupported {
                attribute: order.attribute.clone(),
                path: path.to_string(),
            })
        }
    }

    /// The store-side table description implied by this catalog.
    pub fn table_schema(&self, table_name: &str) -> TableSchema {
        TableSchema {
            name: table_name.to_string(),
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key.clone(),
            indexes: self
                .indexes
                .iter()
                .map(|index| IndexDefinition {
                    name: index.name.clone(),
                    key_attribute: index.key_attribute.clone(),
                    sort_attribute: index.sort_attribute.clone(),
                    projection: Projection::Include(index.projected_fields.clone()),
                })
                .collect(),
        }
    }
}
