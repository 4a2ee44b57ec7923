//! Entity mapping: `Music` values to storage items and back.
//!
//! Items are JSON objects keyed by the attribute names in
//! [`crate::types::attr`]. Unset optional fields are omitted from the item
//! rather than written as `null`, and an explicit `null` read back from the
//! store is treated as absent. Reviews are stored inline as a list of maps.

use serde_json::{Map, Number, Value};

use crate::error::MappingError;
use crate::types::{Music, Review, attr};

/// Convert a song into a storage item.
///
/// Both key attributes must be set; the key codec assigns them before a
/// save reaches this point.
pub fn to_item(music: &Music) -> Result<Value, MappingError> {
    let artist = music
        .artist
        .as_ref()
        .ok_or(MappingError::MissingAttribute(attr::ARTIST))?;
    let song_title = music
        .song_title
        .as_ref()
        .ok_or(MappingError::MissingAttribute(attr::SONG_TITLE))?;

    let mut item = Map::new();
    if let Some(id) = &music.id {
        item.insert(attr::ID.to_string(), Value::String(id.clone()));
    }
    item.insert(attr::ARTIST.to_string(), Value::String(artist.clone()));
    item.insert(attr::SONG_TITLE.to_string(), Value::String(song_title.clone()));

    for (name, field) in [
        (attr::ALBUM_TITLE, &music.album_title),
        (attr::GENRE, &music.genre),
        (attr::QUALITY, &music.quality),
    ] {
        if let Some(v) = field {
            item.insert(name.to_string(), Value::String(v.clone()));
        }
    }

    if let Some(year) = music.year {
        item.insert(attr::YEAR.to_string(), Value::from(year));
    }

    if let Some(reviews) = &music.reviews {
        let list = reviews
            .iter()
            .map(review_to_value)
            .collect::<Result<Vec<_>, _>>()?;
        item.insert(attr::REVIEWS.to_string(), Value::Array(list));
    }

    Ok(Value::Object(item))
}

/// Convert a storage item back into a song.
///
/// Key attributes are required. Every other attribute may be absent, which
/// is how projected index results come back.
pub fn from_item(item: &Value) -> Result<Music, MappingError> {
    let obj = item.as_object().ok_or(MappingError::NotAnObject)?;

    let artist =
        optional_string(obj, attr::ARTIST)?.ok_or(MappingError::MissingAttribute(attr::ARTIST))?;
    let song_title = optional_string(obj, attr::SONG_TITLE)?
        .ok_or(MappingError::MissingAttribute(attr::SONG_TITLE))?;

    Ok(Music {
        id: optional_string(obj, attr::ID)?,
        artist: Some(artist),
        song_title: Some(song_title),
        album_title: optional_string(obj, attr::ALBUM_TITLE)?,
        genre: optional_string(obj, attr::GENRE)?,
        year: optional_year(obj)?,
        quality: optional_string(obj, attr::QUALITY)?,
        reviews: optional_reviews(obj)?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn review_to_value(review: &Review) -> Result<Value, MappingError> {
    let rating = Number::from_f64(f64::from(review.rating))
        .ok_or_else(|| MappingError::NonFiniteNumber(format!("{}.{}", attr::REVIEWS, attr::RATING)))?;

    let mut map = Map::new();
    map.insert(
        attr::DESCRIPTION.to_string(),
        Value::String(review.description.clone()),
    );
    map.insert(attr::RATING.to_string(), Value::Number(rating));
    Ok(Value::Object(map))
}

/// Look up an attribute, treating `null` as absent.
fn present<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn optional_string(obj: &Map<String, Value>, name: &str) -> Result<Option<String>, MappingError> {
    match present(obj, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MappingError::WrongShape {
            attribute: name.to_string(),
            expected: "a string",
        }),
    }
}

fn optional_year(obj: &Map<String, Value>) -> Result<Option<i32>, MappingError> {
    let Some(val) = present(obj, attr::YEAR) else {
        return Ok(None);
    };
    let wrong_shape = || MappingError::WrongShape {
        attribute: attr::YEAR.to_string(),
        expected: "a 32-bit integer",
    };

    if let Some(n) = val.as_i64() {
        return i32::try_from(n).map(Some).map_err(|_| wrong_shape());
    }
    // Stores that keep every number as a double hand integers back as `1984.0`.
    match val.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX) => {
            Ok(Some(f as i32))
        }
        _ => Err(wrong_shape()),
    }
}

fn optional_reviews(obj: &Map<String, Value>) -> Result<Option<Vec<Review>>, MappingError> {
    let Some(val) = present(obj, attr::REVIEWS) else {
        return Ok(None);
    };
    let list = val.as_array().ok_or_else(|| MappingError::WrongShape {
        attribute: attr::REVIEWS.to_string(),
        expected: "a list of reviews",
    })?;

    list.iter()
        .enumerate()
        .map(|(i, entry)| review_from_value(i, entry))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn review_from_value(position: usize, entry: &Value) -> Result<Review, MappingError> {
    let path = |field: &str| format!("{}[{position}].{field}", attr::REVIEWS);

    let map = entry.as_object().ok_or_else(|| MappingError::WrongShape {
        attribute: format!("{}[{position}]", attr::REVIEWS),
        expected: "a map",
    })?;

    let description = match present(map, attr::DESCRIPTION) {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(MappingError::WrongShape {
                attribute: path(attr::DESCRIPTION),
                expected: "a string",
            });
        }
        None => return Err(MappingError::MissingAttribute(attr::DESCRIPTION)),
    };

    let rating = match present(map, attr::RATING) {
        Some(v) => v.as_f64().ok_or_else(|| MappingError::WrongShape {
            attribute: path(attr::RATING),
            expected: "a number",
        })?,
        None => return Err(MappingError::MissingAttribute(attr::RATING)),
    };
    let rating = rating as f32;
    if !rating.is_finite() {
        return Err(MappingError::NonFiniteNumber(path(attr::RATING)));
    }

    Ok(Review {
        description,
        rating,
    })
}
