//! Repository configuration.

use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_TABLE_NAME;

/// Settings for a [`crate::repository::MusicRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Table the repository reads and writes.
    pub table_name: String,
    /// Whether predicates no key or index covers may fall back to a full
    /// table scan. When off they fail with `QueryError::ScanDisabled`.
    pub scan_enabled: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            scan_enabled: true,
        }
    }
}

impl RepositoryConfig {
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    pub fn scan_enabled(mut self, enabled: bool) -> Self {
        self.scan_enabled = enabled;
        self
    }
}
