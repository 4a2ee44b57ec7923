//! Core types: the `Music` entity, embedded reviews, composite keys, limits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage attribute names of a `Music` item.
pub mod attr {
    pub const ID: &str = "id";
    pub const ARTIST: &str = "artist";
    pub const SONG_TITLE: &str = "songTitle";
    pub const ALBUM_TITLE: &str = "albumTitle";
    pub const GENRE: &str = "genre";
    pub const YEAR: &str = "year";
    pub const QUALITY: &str = "quality";
    pub const REVIEWS: &str = "reviews";
    pub const DESCRIPTION: &str = "description";
    pub const RATING: &str = "rating";
}

/// Name of the secondary index over `year`.
pub const YEAR_INDEX: &str = "year-index";

/// Default table name for `Music` items.
pub const DEFAULT_TABLE_NAME: &str = "Music";

/// Maximum item size in bytes (400KB, matching DynamoDB).
pub const MAX_ITEM_SIZE: usize = 400 * 1024;

/// Maximum partition key size in bytes (2048, matching DynamoDB).
pub const MAX_PARTITION_KEY_SIZE: usize = 2048;

/// Maximum sort key size in bytes (1024, matching DynamoDB).
pub const MAX_SORT_KEY_SIZE: usize = 1024;

/// A song, identified by `(artist, song_title)`.
///
/// Every field is optional: items returned through a projected secondary
/// index only carry the projected attributes, and the rest stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Music {
    /// Surrogate identifier, allocated on first save and never changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Partition key. Allocated by the store when unset at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Sort key. Always supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}

impl Music {
    /// Create a song with its composite key set.
    pub fn new(artist: impl Into<String>, song_title: impl Into<String>) -> Self {
        Self {
            artist: Some(artist.into()),
            song_title: Some(song_title.into()),
            ..Self::default()
        }
    }

    /// Set the album title.
    pub fn album_title(mut self, album_title: impl Into<String>) -> Self {
        self.album_title = Some(album_title.into());
        self
    }

    /// Set the genre.
    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Set the release year. Served by `year-index`.
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set the quality label.
    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Replace the embedded reviews.
    pub fn reviews(mut self, reviews: Vec<Review>) -> Self {
        self.reviews = Some(reviews);
        self
    }

    /// The composite key, if both parts are set.
    pub fn key(&self) -> Option<CompositeKey> {
        match (&self.artist, &self.song_title) {
            (Some(artist), Some(song_title)) => {
                Some(CompositeKey::new(artist.clone(), song_title.clone()))
            }
            _ => None,
        }
    }
}

/// An embedded review. Owned by its song; compared by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub description: String,
    pub rating: f32,
}

impl Review {
    /// Create a review with a description and rating.
    pub fn new(description: impl Into<String>, rating: f32) -> Self {
        Self {
            description: description.into(),
            rating,
        }
    }
}

/// A fully bound `(partition, sort)` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    pub partition: String,
    pub sort: String,
}

impl CompositeKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

/// Order of results within a partition or index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ASC"),
            SortOrder::Descending => write!(f, "DESC"),
        }
    }
}
