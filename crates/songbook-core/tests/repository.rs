//! Integration tests for songbook-core: repository operations end to end
//! against the in-process store, plus a call-recording store wrapper.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use songbook_core::error::{KeyError, QueryError, StoreError};
use songbook_core::query::FilterExpr;
use songbook_core::types::attr;
use songbook_core::{
    CompositeKey, Error, ItemStream, MemoryStore, Music, MusicRepository, Predicate, Review,
    SortOrder, StoreClient,
};

// ---------------------------------------------------------------------------
// Recording store
// ---------------------------------------------------------------------------

/// Wraps a store and records the name of every operation called on it.
struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::music(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().push(op);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn reset(&self) {
        self.calls.lock().clear();
    }
}

impl StoreClient for RecordingStore {
    fn put_item(&self, item: Value) -> Result<(), StoreError> {
        self.record("put_item");
        self.inner.put_item(item)
    }

    fn get_item(&self, key: &CompositeKey) -> Result<Option<Value>, StoreError> {
        self.record("get_item");
        self.inner.get_item(key)
    }

    fn delete_item(&self, key: &CompositeKey) -> Result<(), StoreError> {
        self.record("delete_item");
        self.inner.delete_item(key)
    }

    fn query_by_partition(
        &self,
        partition: &str,
        order: SortOrder,
        filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError> {
        self.record("query_by_partition");
        self.inner.query_by_partition(partition, order, filter)
    }

    fn query_index(
        &self,
        index: &str,
        value: &Value,
        order: SortOrder,
        filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError> {
        self.record("query_index");
        self.inner.query_index(index, value, order, filter)
    }

    fn scan(&self, filter: Option<&FilterExpr>) -> Result<ItemStream, StoreError> {
        self.record("scan");
        self.inner.scan(filter)
    }

    fn generate_unique_value(&self) -> Result<String, StoreError> {
        self.record("generate_unique_value");
        self.inner.generate_unique_value()
    }
}

/// A store whose every call fails.
struct UnavailableStore;

impl StoreClient for UnavailableStore {
    fn put_item(&self, _item: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    fn get_item(&self, _key: &CompositeKey) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    fn delete_item(&self, _key: &CompositeKey) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    fn query_by_partition(
        &self,
        _partition: &str,
        _order: SortOrder,
        _filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    fn query_index(
        &self,
        _index: &str,
        _value: &Value,
        _order: SortOrder,
        _filter: Option<&FilterExpr>,
    ) -> Result<ItemStream, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    fn scan(&self, _filter: Option<&FilterExpr>) -> Result<ItemStream, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    fn generate_unique_value(&self) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }
}

fn dog_spot() -> Music {
    Music::new("No one you know", "My Dog Spot")
        .album_title("Hey Now")
        .genre("Country")
        .year(1984)
        .quality("High")
        .reviews(vec![
            Review::new("Really good song", 4.5),
            Review::new("Classic", 4.8),
        ])
}

fn somewhere_down_the_road() -> Music {
    Music::new("No one you know", "Somewhere Down The Road")
        .album_title("Somewhat Famous")
        .genre("Country")
        .year(1985)
        .quality("Medium")
}

fn titles(songs: &[Music]) -> Vec<&str> {
    songs
        .iter()
        .map(|s| s.song_title.as_deref().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[test]
fn test_music_repository_scenario() {
    let repo = MusicRepository::new(MemoryStore::music());

    let first = repo.save(dog_spot()).unwrap();
    let second = repo.save(somewhere_down_the_road()).unwrap();

    // Partition-key finder.
    let by_artist = repo.find_by_artist("No one you know").unwrap();
    assert_eq!(by_artist.len(), 2);

    // Sort key alone is served by a scan.
    let by_title = repo.find_by_song_title("My Dog Spot").unwrap();
    assert_eq!(by_title, vec![first.clone()]);

    // Key lookup.
    let found = repo.find_by_id(&second.key().unwrap()).unwrap();
    assert_eq!(found, Some(second.clone()));

    // Index query returns keys only.
    let by_year = repo.find_by_year(1984).unwrap();
    assert_eq!(by_year.len(), 1);
    assert_eq!(by_year[0].artist, first.artist);
    assert_eq!(by_year[0].song_title, first.song_title);
    assert_eq!(by_year[0].album_title, None);

    // Update via re-save.
    let updated = repo
        .save(first.clone().album_title("Hey Now (Remastered)"))
        .unwrap();
    assert_eq!(updated.id, first.id);
    let reread = repo.find_by_id(&first.key().unwrap()).unwrap().unwrap();
    assert_eq!(reread.album_title.as_deref(), Some("Hey Now (Remastered)"));
    assert_eq!(reread.reviews, first.reviews);

    // Delete.
    assert_eq!(repo.count().unwrap(), 2);
    repo.delete(&first).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
    assert_eq!(repo.find_by_id(&first.key().unwrap()).unwrap(), None);
}

#[test]
fn test_order_by_song_title_desc() {
    let repo = MusicRepository::new(MemoryStore::music());
    repo.save_all(vec![
        somewhere_down_the_road(),
        dog_spot(),
        Music::new("No one you know", "Another Tune"),
        Music::new("Someone else", "Zzz"),
    ])
    .unwrap();

    let songs = repo
        .find_by_artist_order_by_song_title_desc("No one you know")
        .unwrap();
    assert_eq!(
        titles(&songs),
        vec!["Somewhere Down The Road", "My Dog Spot", "Another Tune"]
    );

    let ascending = repo.find_by_artist("No one you know").unwrap();
    assert_eq!(
        titles(&ascending),
        vec!["Another Tune", "My Dog Spot", "Somewhere Down The Road"]
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_replace_keeps_single_item() {
    let repo = MusicRepository::new(MemoryStore::music());
    let first = repo.save(dog_spot()).unwrap();
    let replacement = Music::new("No one you know", "My Dog Spot").genre("Jazz");
    let saved = repo.save(replacement).unwrap();

    assert_eq!(repo.count().unwrap(), 1);
    let stored = repo.find_by_id(&saved.key().unwrap()).unwrap().unwrap();
    assert_eq!(stored, saved);
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.reviews, None);
    assert_eq!(stored.year, None);

    // The replaced year is no longer indexed.
    assert!(repo.find_by_year(1984).unwrap().is_empty());
}

#[test]
fn test_resave_of_index_result_keeps_id() {
    let repo = MusicRepository::new(MemoryStore::music());
    let first = repo.save(dog_spot()).unwrap();

    let mut song = repo.find_by_year(1984).unwrap().remove(0);
    assert_eq!(song.id, None);
    song.album_title = Some("Hey Now (Remastered)".to_string());
    let saved = repo.save(song).unwrap();
    assert_eq!(saved.id, first.id);

    let stored = repo.find_by_id(&first.key().unwrap()).unwrap().unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.album_title.as_deref(), Some("Hey Now (Remastered)"));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn test_resave_with_existing_id_skips_lookup() {
    let store = Arc::new(RecordingStore::new());
    let repo = MusicRepository::new(Arc::clone(&store));
    let first = repo.save(dog_spot()).unwrap();
    store.reset();

    repo.save(first.album_title("Hey Now (Live)")).unwrap();
    assert_eq!(store.calls(), vec!["put_item"]);
}

#[test]
fn test_delete_leaves_siblings() {
    let repo = MusicRepository::new(MemoryStore::music());
    let first = repo.save(dog_spot()).unwrap();
    let second = repo.save(somewhere_down_the_road()).unwrap();

    repo.delete_by_id(&first.key().unwrap()).unwrap();
    assert_eq!(repo.find_by_id(&first.key().unwrap()).unwrap(), None);
    assert_eq!(
        repo.find_by_id(&second.key().unwrap()).unwrap(),
        Some(second)
    );
    assert_eq!(repo.find_by_artist("No one you know").unwrap().len(), 1);
}

#[test]
fn test_index_results_only_carry_projected_fields() {
    let repo = MusicRepository::new(MemoryStore::music());
    repo.save(dog_spot()).unwrap();
    repo.save(Music::new("Acme Band", "Happy Day").year(1984).genre("Rock"))
        .unwrap();

    let songs = repo.find_by_year(1984).unwrap();
    assert_eq!(songs.len(), 2);
    for song in songs {
        assert!(song.artist.is_some());
        assert!(song.song_title.is_some());
        assert_eq!(song.id, None);
        assert_eq!(song.album_title, None);
        assert_eq!(song.genre, None);
        assert_eq!(song.year, None);
        assert_eq!(song.quality, None);
        assert_eq!(song.reviews, None);
    }
}

#[test]
fn test_unsupported_ordering_never_reaches_store() {
    let store = Arc::new(RecordingStore::new());
    let repo = MusicRepository::new(Arc::clone(&store));
    repo.save(dog_spot()).unwrap();
    store.reset();

    let cases = [
        Predicate::eq(attr::ARTIST, "No one you know").order_by(attr::YEAR, SortOrder::Ascending),
        Predicate::eq(attr::YEAR, 1984).order_by(attr::SONG_TITLE, SortOrder::Descending),
        Predicate::eq(attr::GENRE, "Country").order_by(attr::SONG_TITLE, SortOrder::Ascending),
    ];
    for predicate in &cases {
        let err = repo.find_by(predicate).err().unwrap();
        assert!(
            matches!(err, Error::Query(QueryError::OrderingNotSupported { .. })),
            "unexpected error for {predicate}: {err}"
        );
    }

    let err = repo.find_by(&Predicate::eq("tempo", 120)).err().unwrap();
    assert!(matches!(err, Error::Query(QueryError::UnknownAttribute(_))));

    assert!(store.calls().is_empty());
}

#[test]
fn test_access_paths_hit_expected_store_calls() {
    let store = Arc::new(RecordingStore::new());
    let repo = MusicRepository::new(Arc::clone(&store));
    let saved = repo.save(dog_spot()).unwrap();
    assert_eq!(
        store.calls(),
        vec!["get_item", "generate_unique_value", "put_item"]
    );

    let cases: Vec<(Box<dyn Fn() -> usize + '_>, &str)> = vec![
        (
            Box::new(|| repo.find_by_id(&saved.key().unwrap()).unwrap().iter().count()),
            "get_item",
        ),
        (
            Box::new(|| repo.find_by_artist("No one you know").unwrap().len()),
            "query_by_partition",
        ),
        (Box::new(|| repo.find_by_year(1984).unwrap().len()), "query_index"),
        (Box::new(|| repo.find_by_genre("Country").unwrap().len()), "scan"),
        (Box::new(|| repo.find_by_quality("High").unwrap().len()), "scan"),
        (Box::new(|| repo.find_by_song_title("My Dog Spot").unwrap().len()), "scan"),
    ];
    for (run, expected) in cases {
        store.reset();
        assert_eq!(run(), 1);
        assert_eq!(store.calls(), vec![expected]);
    }
}

#[test]
fn test_save_without_sort_key_touches_nothing() {
    let store = Arc::new(RecordingStore::new());
    let repo = MusicRepository::new(Arc::clone(&store));
    let err = repo
        .save(Music {
            album_title: Some("Orphan".to_string()),
            ..Music::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::Key(KeyError::MissingSortKey(_))));
    assert!(store.calls().is_empty());
}

#[test]
fn test_missing_artist_generated_once() {
    let store = Arc::new(RecordingStore::new());
    let repo = MusicRepository::new(Arc::clone(&store));
    let mut song = Music::new("placeholder", "Untitled");
    song.artist = None;
    song.id = Some("existing".to_string());

    let saved = repo.save(song).unwrap();
    assert_eq!(
        store.calls(),
        vec!["generate_unique_value", "put_item"]
    );
    assert_eq!(saved.id.as_deref(), Some("existing"));
    assert!(saved.artist.is_some());
}

#[test]
fn test_store_errors_pass_through() {
    let repo = MusicRepository::new(UnavailableStore);
    let err = repo.find_by_artist("a").unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
    let err = repo.save(Music::new("a", "b")).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));

    // Planning failures still come first.
    let err = repo.find_by(&Predicate::default()).err().unwrap();
    assert!(matches!(err, Error::Query(QueryError::EmptyPredicate)));
}

#[test]
fn test_repository_shared_across_threads() {
    let repo = Arc::new(MusicRepository::new(MemoryStore::music()));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let repo = Arc::clone(&repo);
            std::thread::spawn(move || {
                for i in 0..10 {
                    repo.save(Music::new(format!("artist {t}"), format!("song {i}")))
                        .unwrap();
                }
                repo.find_by_artist(&format!("artist {t}")).unwrap().len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
    assert_eq!(repo.count().unwrap(), 40);
}
