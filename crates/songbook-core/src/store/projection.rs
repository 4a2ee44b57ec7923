//! Index projections: trim an item down to the attributes an index carries.
//!
//! Projection is applied after filtering. Table key attributes are always
//! included.

use serde_json::{Map, Value};

use super::Projection;
use crate::query::filter::resolve_attr;

/// Reduce `item` to what `projection` returns, plus `key_attrs`.
pub fn project_item(item: &Value, projection: &Projection, key_attrs: &[&str]) -> Value {
    let paths: &[String] = match projection {
        Projection::All => return item.clone(),
        Projection::KeysOnly => &[],
        Projection::Include(paths) => paths,
    };

    let mut result = Map::new();

    if let Some(obj) = item.as_object() {
        for &key in key_attrs {
            if let Some(v) = obj.get(key) {
                result.insert(key.to_string(), v.clone());
            }
        }
    }

    for path in paths {
        let val = resolve_attr(item, path);
        if !val.is_null() {
            set_nested_path(&mut result, path, val.clone());
        }
    }

    Value::Object(result)
}

/// Set a value at a dot-separated path, creating intermediate objects as
/// needed. A path running through a non-object value is skipped.
fn set_nested_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        target.insert(path.to_string(), value);
        return;
    };

    let mut current = target;
    for seg in parents.split('.') {
        let entry = current
            .entry(seg)
            .or_insert_with(|| Value::Object(Map::new()));
        match entry.as_object_mut() {
            Some(obj) => current = obj,
            None => return,
        }
    }
    current.insert(leaf.to_string(), value);
}
