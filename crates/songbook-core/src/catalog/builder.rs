use crate::error::SchemaError;

use super::{AccessPathCatalog, IndexPath};

// ---------------------------------------------------------------------------
// CatalogBuilder
// ---------------------------------------------------------------------------

/// Builder for declaring an entity's access paths.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    partition_key: Option<String>,
    sort_key: Option<String>,
    attributes: Vec<String>,
    indexes: Vec<IndexPath>,
}

impl CatalogBuilder {
    /// Set the partition key attribute.
    pub fn partition_key(mut self, name: &str) -> Self {
        self.partition_key = Some(name.to_string());
        self
    }

    /// Set the sort key attribute.
    pub fn sort_key(mut self, name: &str) -> Self {
        self.sort_key = Some(name.to_string());
        self
    }

    /// Declare non-key attributes that predicates may reference.
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare a secondary index.
    pub fn index(mut self, index: IndexPath) -> Self {
        self.indexes.push(index);
        self
    }

    /// Validate the declaration.
    pub fn build(self) -> Result<AccessPathCatalog, SchemaError> {
        let partition_key = self.partition_key.ok_or(SchemaError::PartitionKeyRequired)?;
        let sort_key = self.sort_key.ok_or(SchemaError::SortKeyRequired)?;

        let mut declared: Vec<&str> = vec![partition_key.as_str(), sort_key.as_str()];
        for name in &self.attributes {
            if declared.contains(&name.as_str()) {
                return Err(SchemaError::DuplicateAttribute(name.clone()));
            }
            declared.push(name);
        }

        for (i, index) in self.indexes.iter().enumerate() {
            if self.indexes[..i].iter().any(|other| other.name == index.name) {
                return Err(SchemaError::IndexAlreadyExists(index.name.clone()));
            }
            let referenced = std::iter::once(&index.key_attribute)
                .chain(index.sort_attribute.iter())
                .chain(index.projected_fields.iter());
            for attribute in referenced {
                if !declared.contains(&attribute.as_str()) {
                    return Err(SchemaError::IndexKeyAttributeMissing {
                        index: index.name.clone(),
                        attribute: attribute.clone(),
                    });
                }
            }
        }

        Ok(AccessPathCatalog {
            partition_key,
            sort_key,
            attributes: self.attributes,
            indexes: self.indexes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{YEAR_INDEX, attr};

    #[test]
    fn test_builder_matches_music_catalog() {
        let built = AccessPathCatalog::builder()
            .partition_key(attr::ARTIST)
            .sort_key(attr::SONG_TITLE)
            .attributes([
                attr::ID,
                attr::ALBUM_TITLE,
                attr::GENRE,
                attr::YEAR,
                attr::QUALITY,
            ])
            .index(IndexPath::new(YEAR_INDEX, attr::YEAR).project([attr::ARTIST, attr::SONG_TITLE]))
            .build()
            .unwrap();
        assert_eq!(built, AccessPathCatalog::music());
    }

    #[test]
    fn test_builder_requires_keys() {
        let err = AccessPathCatalog::builder()
            .sort_key("songTitle")
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::PartitionKeyRequired);

        let err = AccessPathCatalog::builder()
            .partition_key("artist")
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::SortKeyRequired);
    }

    #[test]
    fn test_builder_rejects_duplicate_attribute() {
        let err = AccessPathCatalog::builder()
            .partition_key("artist")
            .sort_key("songTitle")
            .attributes(["genre", "artist"])
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateAttribute("artist".to_string()));
    }

    #[test]
    fn test_builder_rejects_duplicate_index() {
        let err = AccessPathCatalog::builder()
            .partition_key("artist")
            .sort_key("songTitle")
            .attributes(["year"])
            .index(IndexPath::new("by-year", "year"))
            .index(IndexPath::new("by-year", "year"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::IndexAlreadyExists("by-year".to_string()));
    }

    #[test]
    fn test_builder_rejects_undeclared_index_attribute() {
        let err = AccessPathCatalog::builder()
            .partition_key("artist")
            .sort_key("songTitle")
            .index(IndexPath::new("by-year", "year"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::IndexKeyAttributeMissing {
                index: "by-year".to_string(),
                attribute: "year".to_string(),
            }
        );

        let err = AccessPathCatalog::builder()
            .partition_key("artist")
            .sort_key("songTitle")
            .attributes(["year"])
            .index(IndexPath::new("by-year", "year").project(["genre"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::IndexKeyAttributeMissing { .. }));
    }
}
