//! Key codec: building, validating and allocating composite keys.

use tracing::debug;

use crate::error::{Error, KeyError};
use crate::store::StoreClient;
use crate::types::{CompositeKey, MAX_PARTITION_KEY_SIZE, MAX_SORT_KEY_SIZE, Music, attr};

/// Build a validated composite key.
pub fn encode(partition: &str, sort: &str) -> Result<CompositeKey, KeyError> {
    validate_partition_key(partition)?;
    validate_sort_key(sort)?;
    Ok(CompositeKey::new(partition, sort))
}

/// Extract the composite key of a song. Both parts must be set.
pub fn decode(music: &Music) -> Result<CompositeKey, KeyError> {
    let sort = music
        .song_title
        .as_deref()
        .ok_or(KeyError::MissingSortKey(attr::SONG_TITLE))?;
    let partition = music
        .artist
        .as_deref()
        .ok_or(KeyError::MissingPartitionKey(attr::ARTIST))?;
    encode(partition, sort)
}

/// Validate an existing key (e.g. one handed to `find_by_id`).
pub fn validate(key: &CompositeKey) -> Result<(), KeyError> {
    validate_partition_key(&key.partition)?;
    validate_sort_key(&key.sort)
}

/// Fill in the generated parts of a song's identity before it is written.
///
/// The sort key is checked first so a song without one never reaches the
/// store. A missing partition key is allocated with `generate_unique_value`.
/// A missing surrogate id is taken from the stored item under the same key
/// when there is one, so re-saving a song never changes its id; otherwise a
/// new one is allocated.
pub fn assign<S: StoreClient + ?Sized>(music: &mut Music, store: &S) -> Result<CompositeKey, Error> {
    let sort = music
        .song_title
        .as_deref()
        .ok_or(KeyError::MissingSortKey(attr::SONG_TITLE))?;
    validate_sort_key(sort)?;

    let generated_partition = music.artist.is_none();
    if generated_partition {
        let generated = store.generate_unique_value()?;
        debug!(partition = %generated, "generated partition key");
        music.artist = Some(generated);
    }
    let key = decode(music)?;

    if music.id.is_none() {
        // A freshly generated partition cannot hold an existing item.
        let stored = if generated_partition {
            None
        } else {
            stored_id(store, &key)?
        };
        music.id = match stored {
            Some(id) => Some(id),
            None => Some(store.generate_unique_value()?),
        };
    }

    Ok(key)
}

/// The surrogate id of the item currently stored under `key`, if any.
fn stored_id<S: StoreClient + ?Sized>(store: &S, key: &CompositeKey) -> Result<Option<String>, Error> {
    let item = store.get_item(key)?;
    Ok(item.and_then(|item| item.get(attr::ID)?.as_str().map(str::to_string)))
}

fn validate_partition_key(value: &str) -> Result<(), KeyError> {
    validate_key_part(value, attr::ARTIST, MAX_PARTITION_KEY_SIZE)
}

fn validate_sort_key(value: &str) -> Result<(), KeyError> {
    validate_key_part(value, attr::SONG_TITLE, MAX_SORT_KEY_SIZE)
}

fn validate_key_part(value: &str, attribute: &'static str, max: usize) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::Empty(attribute));
    }
    if value.as_bytes().contains(&0x00) {
        return Err(KeyError::NullByte(attribute));
    }
    if value.len() > max {
        return Err(KeyError::TooLarge {
            attribute,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_encode_valid_key() {
        let key = encode("No one you know", "My Dog Spot").unwrap();
        assert_eq!(key, CompositeKey::new("No one you know", "My Dog Spot"));
    }

    #[test]
    fn test_encode_rejects_empty_parts() {
        assert_eq!(encode("", "x").unwrap_err(), KeyError::Empty(attr::ARTIST));
        assert_eq!(
            encode("x", "").unwrap_err(),
            KeyError::Empty(attr::SONG_TITLE)
        );
    }

    #[test]
    fn test_encode_rejects_null_byte() {
        assert_eq!(
            encode("a\0b", "x").unwrap_err(),
            KeyError::NullByte(attr::ARTIST)
        );
    }

    #[test]
    fn test_key_size_limits() {
        let pk = "p".repeat(MAX_PARTITION_KEY_SIZE);
        let sk = "s".repeat(MAX_SORT_KEY_SIZE);
        assert!(encode(&pk, &sk).is_ok());

        let too_long_pk = "p".repeat(MAX_PARTITION_KEY_SIZE + 1);
        assert_eq!(
            encode(&too_long_pk, "x").unwrap_err(),
            KeyError::TooLarge {
                attribute: attr::ARTIST,
                max: MAX_PARTITION_KEY_SIZE,
                actual: MAX_PARTITION_KEY_SIZE + 1,
            }
        );

        let too_long_sk = "s".repeat(MAX_SORT_KEY_SIZE + 1);
        assert!(matches!(
            encode("x", &too_long_sk),
            Err(KeyError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_missing_parts() {
        let no_sort = Music {
            artist: Some("a".to_string()),
            ..Music::default()
        };
        assert_eq!(
            decode(&no_sort).unwrap_err(),
            KeyError::MissingSortKey(attr::SONG_TITLE)
        );

        let no_partition = Music {
            song_title: Some("b".to_string()),
            ..Music::default()
        };
        assert_eq!(
            decode(&no_partition).unwrap_err(),
            KeyError::MissingPartitionKey(attr::ARTIST)
        );
    }

    #[test]
    fn test_assign_generates_partition_and_id() {
        let store = MemoryStore::music();
        let mut song = Music {
            song_title: Some("Untitled".to_string()),
            ..Music::default()
        };
        let key = assign(&mut song, &store).unwrap();
        assert_eq!(song.artist.as_deref(), Some(key.partition.as_str()));
        assert!(!key.partition.is_empty());
        assert!(song.id.is_some());
        assert_ne!(song.id.as_deref(), song.artist.as_deref());
    }

    #[test]
    fn test_assign_keeps_existing_identity() {
        let store = MemoryStore::music();
        let mut song = Music::new("Acme Band", "Happy Day");
        song.id = Some("fixed-id".to_string());
        let key = assign(&mut song, &store).unwrap();
        assert_eq!(key, CompositeKey::new("Acme Band", "Happy Day"));
        assert_eq!(song.id.as_deref(), Some("fixed-id"));
    }

    #[test]
    fn test_assign_reuses_stored_id() {
        let store = MemoryStore::music();
        let mut first = Music::new("Acme Band", "Happy Day");
        assign(&mut first, &store).unwrap();
        store.put_item(crate::mapper::to_item(&first).unwrap()).unwrap();

        let mut again = Music::new("Acme Band", "Happy Day").genre("Rock");
        assign(&mut again, &store).unwrap();
        assert_eq!(again.id, first.id);

        let mut other = Music::new("Acme Band", "Another Day");
        assign(&mut other, &store).unwrap();
        assert!(other.id.is_some());
        assert_ne!(other.id, first.id);
    }

    #[test]
    fn test_assign_rejects_bad_partition_before_store() {
        let store = MemoryStore::music();
        let mut song = Music::new("", "Happy Day");
        let err = assign(&mut song, &store).unwrap_err();
        assert!(matches!(err, Error::Key(KeyError::Empty(attr::ARTIST))));
        assert_eq!(song.id, None);
    }

    #[test]
    fn test_assign_requires_sort_key() {
        let store = MemoryStore::music();
        let mut song = Music {
            artist: Some("Acme Band".to_string()),
            ..Music::default()
        };
        let err = assign(&mut song, &store).unwrap_err();
        assert!(matches!(
            err,
            Error::Key(KeyError::MissingSortKey(attr::SONG_TITLE))
        ));
        assert_eq!(song.id, None);
    }
}
