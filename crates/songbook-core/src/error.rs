//! Error types for all repository operations.

use thiserror::Error;

/// Top-level error type for songbook operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Conversion failures between `Music` entities and storage items.
#[derive(Debug, Error, PartialEq)]
pub enum MappingError {
    #[error("item is not a JSON object")]
    NotAnObject,

    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("attribute '{attribute}' has the wrong shape: expected {expected}")]
    WrongShape {
        attribute: String,
        expected: &'static str,
    },

    #[error("attribute '{0}' is not a finite number")]
    NonFiniteNumber(String),
}

/// Missing or malformed composite keys.
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("sort key '{0}' must be supplied by the caller")]
    MissingSortKey(&'static str),

    #[error("partition key '{0}' is not set")]
    MissingPartitionKey(&'static str),

    #[error("key attribute '{0}' must not be empty")]
    Empty(&'static str),

    #[error("null byte (0x00) is not allowed in key attribute '{0}'")]
    NullByte(&'static str),

    #[error("key attribute '{attribute}' exceeds maximum size of {max} bytes (got {actual})")]
    TooLarge {
        attribute: &'static str,
        max: usize,
        actual: usize,
    },
}

/// Predicates that no declared access path can serve.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("predicate must bind at least one attribute")]
    EmptyPredicate,

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("attribute '{0}' is bound more than once")]
    DuplicateAttribute(String),

    #[error("value for '{attribute}' must be {expected}")]
    InvalidValue {
        attribute: String,
        expected: &'static str,
    },

    #[error("cannot order by '{attribute}' on access path {path}")]
    OrderingNotSupported { attribute: String, path: String },

    #[error("predicate requires a full table scan but scans are disabled")]
    ScanDisabled,
}

/// Invalid access path declarations.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("partition key is required")]
    PartitionKeyRequired,

    #[error("sort key is required")]
    SortKeyRequired,

    #[error("attribute declared twice: {0}")]
    DuplicateAttribute(String),

    #[error("index already exists: {0}")]
    IndexAlreadyExists(String),

    #[error("index '{index}' references missing attribute '{attribute}'")]
    IndexKeyAttributeMissing { index: String, attribute: String },
}

/// Failures reported by a store client.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing key attribute: {0}")]
    MissingKeyAttribute(String),

    #[error("item is not a JSON object")]
    NotAnObject,

    #[error("item exceeds maximum size of {max} bytes (got {actual})")]
    ItemTooLarge { max: usize, actual: usize },

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted item: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Invalid filter expressions.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("invalid filter expression: {0}")]
    InvalidExpression(String),
}

pub type Result<T> = std::result::Result<T, Error>;
