//! # Songbook
//!
//! A repository layer for `Music` entities over a DynamoDB-style wide-column
//! store.
//!
//! Songs are identified by a composite key (`artist` partition key,
//! `songTitle` sort key) and carry their reviews inline. Every finder is a
//! declarative [`Predicate`]; the query planner picks a key lookup, a
//! secondary-index query or a full table scan from a fixed catalog of
//! access paths, and the store results are mapped back into entities.
//!
//! ## Quick Start
//!
//! ```
//! use songbook_core::{MemoryStore, Music, MusicRepository, Review};
//!
//! let repo = MusicRepository::new(MemoryStore::music());
//!
//! repo.save(
//!     Music::new("No one you know", "My Dog Spot")
//!         .album_title("Hey Now")
//!         .year(1984)
//!         .reviews(vec![Review::new("Really good", 4.5)]),
//! )
//! .unwrap();
//!
//! // Partition-key query.
//! let songs = repo.find_by_artist("No one you know").unwrap();
//! assert_eq!(songs.len(), 1);
//!
//! // Index query: only the projected key attributes come back.
//! let by_year = repo.find_by_year(1984).unwrap();
//! assert_eq!(by_year[0].album_title, None);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod key;
pub mod mapper;
pub mod query;
pub mod repository;
pub mod store;
pub mod types;

pub use catalog::{AccessPath, AccessPathCatalog, music_catalog};
pub use config::RepositoryConfig;
pub use error::{Error, Result};
pub use query::{FilterExpr, PlannedOperation, Predicate, QueryPlanner};
pub use repository::{EntityStream, MusicRepository};
pub use store::{ItemStream, MemoryStore, StoreClient};
pub use types::{CompositeKey, Music, Review, SortOrder};
