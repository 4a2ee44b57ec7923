//! The repository facade: CRUD and finders for [`Music`].
//!
//! Writes go through the key codec and the entity mapper; reads go through
//! the query planner. Named finders only build a [`Predicate`] and hand it
//! to [`MusicRepository::find_by`].

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{AccessPathCatalog, music_catalog};
use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use crate::key;
use crate::mapper;
use crate::query::planner::{PlannedOperation, QueryPlanner};
use crate::query::predicate::Predicate;
use crate::store::{ItemStream, StoreClient};
use crate::types::{CompositeKey, Music, SortOrder, attr};

/// A lazy stream of entities decoded from store items.
///
/// Single-pass. An item that fails to decode yields an error in its place.
pub struct EntityStream {
    items: ItemStream,
}

impl EntityStream {
    fn new(items: ItemStream) -> Self {
        Self { items }
    }
}

impl Iterator for EntityStream {
    type Item = Result<Music>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.next()?;
        Some(
            item.map_err(Error::from)
                .and_then(|item| mapper::from_item(&item).map_err(Error::from)),
        )
    }
}

/// Repository for `Music` entities over any [`StoreClient`].
#[derive(Debug)]
pub struct MusicRepository<S> {
    store: S,
    planner: QueryPlanner,
    config: RepositoryConfig,
}

impl<S: StoreClient> MusicRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, RepositoryConfig::default())
    }

    pub fn with_config(store: S, config: RepositoryConfig) -> Self {
        let planner = QueryPlanner::new(music_catalog()).scan_enabled(config.scan_enabled);
        Self {
            store,
            planner,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AccessPathCatalog {
        self.planner.catalog()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert or replace a song.
    ///
    /// A missing artist and a missing surrogate id are generated by the
    /// store. Returns the song as written, with its identity filled in.
    pub fn save(&self, mut music: Music) -> Result<Music> {
        let key = key::assign(&mut music, &self.store)?;
        let item = mapper::to_item(&music)?;
        self.store.put_item(item)?;
        debug!(table = %self.config.table_name, key = %key, "saved song");
        Ok(music)
    }

    /// Save songs in order, stopping at the first failure.
    pub fn save_all<I>(&self, songs: I) -> Result<Vec<Music>>
    where
        I: IntoIterator<Item = Music>,
    {
        songs.into_iter().map(|song| self.save(song)).collect()
    }

    /// Delete a song by its key attributes. Deleting a missing song succeeds.
    pub fn delete(&self, music: &Music) -> Result<()> {
        let key = key::decode(music)?;
        self.delete_by_id(&key)
    }

    pub fn delete_by_id(&self, key: &CompositeKey) -> Result<()> {
        key::validate(key)?;
        self.store.delete_item(key)?;
        debug!(table = %self.config.table_name, key = %key, "deleted song");
        Ok(())
    }

    /// Delete every song. Returns how many were removed.
    pub fn delete_all(&self) -> Result<usize> {
        let op = self.planner.plan_scan()?;
        let mut deleted = 0;
        for item in self.planner.execute(&self.store, &op)? {
            let key = self.catalog_key(&item?)?;
            self.store.delete_item(&key)?;
            deleted += 1;
        }
        debug!(table = %self.config.table_name, deleted, "deleted all songs");
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn find_by_id(&self, key: &CompositeKey) -> Result<Option<Music>> {
        key::validate(key)?;
        let op = PlannedOperation::GetItem {
            key: key.clone(),
            filter: None,
        };
        EntityStream::new(self.planner.execute(&self.store, &op)?)
            .next()
            .transpose()
    }

    pub fn exists_by_id(&self, key: &CompositeKey) -> Result<bool> {
        Ok(self.find_by_id(key)?.is_some())
    }

    /// Songs for the keys that exist, in input order.
    pub fn find_all_by_id<'a, I>(&self, keys: I) -> Result<Vec<Music>>
    where
        I: IntoIterator<Item = &'a CompositeKey>,
    {
        let mut found = Vec::new();
        for key in keys {
            if let Some(song) = self.find_by_id(key)? {
                found.push(song);
            }
        }
        Ok(found)
    }

    /// Every song, via a full table scan.
    pub fn find_all(&self) -> Result<EntityStream> {
        let op = self.planner.plan_scan()?;
        Ok(EntityStream::new(self.planner.execute(&self.store, &op)?))
    }

    /// Number of stored songs, via a full table scan.
    pub fn count(&self) -> Result<usize> {
        let op = self.planner.plan_scan()?;
        self.planner
            .execute(&self.store, &op)?
            .try_fold(0, |n, item| item.map(|_| n + 1))
            .map_err(Error::from)
    }

    /// Plan a predicate without running it.
    pub fn explain(&self, predicate: &Predicate) -> Result<PlannedOperation> {
        self.planner.plan(predicate)
    }

    /// Songs matching a predicate. Unsupported predicates fail before the
    /// store is called.
    pub fn find_by(&self, predicate: &Predicate) -> Result<EntityStream> {
        let op = self.planner.plan(predicate)?;
        debug!(predicate = %predicate, plan = %op, "planned query");
        Ok(EntityStream::new(self.planner.execute(&self.store, &op)?))
    }

    pub fn find_by_artist(&self, artist: &str) -> Result<Vec<Music>> {
        self.collect(Predicate::eq(attr::ARTIST, artist))
    }

    pub fn find_by_song_title(&self, song_title: &str) -> Result<Vec<Music>> {
        self.collect(Predicate::eq(attr::SONG_TITLE, song_title))
    }

    /// Served by `year-index`: only `artist` and `songTitle` are populated.
    pub fn find_by_year(&self, year: i32) -> Result<Vec<Music>> {
        self.collect(Predicate::eq(attr::YEAR, year))
    }

    pub fn find_by_quality(&self, quality: &str) -> Result<Vec<Music>> {
        self.collect(Predicate::eq(attr::QUALITY, quality))
    }

    pub fn find_by_genre(&self, genre: &str) -> Result<Vec<Music>> {
        self.collect(Predicate::eq(attr::GENRE, genre))
    }

    pub fn find_by_artist_order_by_song_title_desc(&self, artist: &str) -> Result<Vec<Music>> {
        self.collect(
            Predicate::eq(attr::ARTIST, artist).order_by(attr::SONG_TITLE, SortOrder::Descending),
        )
    }

    fn collect(&self, predicate: Predicate) -> Result<Vec<Music>> {
        self.find_by(&predicate)?.collect()
    }

    fn catalog_key(&self, item: &serde_json::Value) -> Result<CompositeKey> {
        let song = mapper::from_item(item)?;
        Ok(key::decode(&song)?)
    }
}

impl<S: StoreClient> MusicRepository<Arc<S>> {
    /// A repository sharing an existing store handle.
    pub fn shared(store: &Arc<S>, config: RepositoryConfig) -> Self {
        Self::with_config(Arc::clone(store), config)
    }
}
