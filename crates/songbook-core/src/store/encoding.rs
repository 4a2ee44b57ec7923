//! Order-preserving byte encodings for secondary index entries.
//!
//! An entry key is `value ++ [sort value] ++ partition ++ sort`. Every part is
//! self-delimiting, so all entries for one indexed value share the encoded
//! value as a prefix and a prefix range finds exactly those entries.

use serde_json::Value;

use crate::types::CompositeKey;

const TAG_NUMBER: u8 = 0x01;
const TAG_STRING: u8 = 0x02;

/// Escaped-terminator string encoding: `0x00` becomes `0x00 0xFF`, and the
/// string ends with `0x00 0x00`.
pub fn encode_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 2);
    for &b in s.as_bytes() {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xFF);
        } else {
            out.push(b);
        }
    }
    out.push(0x00);
    out.push(0x00);
    out
}

/// Encode an f64 so byte order matches numeric order.
///
/// Negative numbers have every bit flipped, the rest only the sign bit.
/// `-0.0` is normalized to `+0.0`. JSON numbers are never NaN.
pub fn encode_number(value: f64) -> [u8; 8] {
    let value = if value == 0.0 { 0.0_f64 } else { value };
    let mut bits = value.to_bits();
    if bits & (1u64 << 63) != 0 {
        bits = !bits;
    } else {
        bits ^= 1u64 << 63;
    }
    bits.to_be_bytes()
}

/// Encode an indexable value. Only strings and numbers can be indexed.
pub fn encode_value(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(s) => {
            let mut out = vec![TAG_STRING];
            out.extend(encode_string(s));
            Some(out)
        }
        Value::Number(n) => {
            let mut out = vec![TAG_NUMBER];
            out.extend(encode_number(n.as_f64()?));
            Some(out)
        }
        _ => None,
    }
}

/// Build the full entry key for an item in an index.
pub fn entry_key(value: &[u8], sort_value: Option<&[u8]>, key: &CompositeKey) -> Vec<u8> {
    let mut out = value.to_vec();
    if let Some(sort_value) = sort_value {
        out.extend_from_slice(sort_value);
    }
    out.extend(encode_string(&key.partition));
    out.extend(encode_string(&key.sort));
    out
}

/// Increment a byte string lexicographically.
///
/// Finds the rightmost byte < 0xFF, increments it, and truncates everything
/// after it. Returns `None` if all bytes are 0xFF.
pub fn increment_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut result = bytes.to_vec();
    for i in (0..result.len()).rev() {
        if result[i] < 0xFF {
            result[i] += 1;
            result.truncate(i + 1);
            return Some(result);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_ordering() {
        let values = [f64::MIN, -1984.0, -0.5, 0.0, 0.5, 1984.0, 2024.0, f64::MAX];
        let encoded: Vec<[u8; 8]> = values.iter().map(|&v| encode_number(v)).collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(encode_number(-0.0), encode_number(0.0));
    }

    #[test]
    fn test_string_ordering_with_prefixes() {
        assert!(encode_string("abc") < encode_string("abd"));
        assert!(encode_string("ab") < encode_string("abc"));
        assert!(encode_string("a\0b") > encode_string("a"));
    }

    #[test]
    fn test_integer_and_float_encode_equal() {
        assert_eq!(encode_value(&json!(1984)), encode_value(&json!(1984.0)));
    }

    #[test]
    fn test_unindexable_values() {
        assert_eq!(encode_value(&json!(true)), None);
        assert_eq!(encode_value(&json!(null)), None);
        assert_eq!(encode_value(&json!([1])), None);
        assert_eq!(encode_value(&json!({"a": 1})), None);
    }

    #[test]
    fn test_prefix_range_isolates_value() {
        let v1984 = encode_value(&json!(1984)).unwrap();
        let v1985 = encode_value(&json!(1985)).unwrap();
        let end = increment_bytes(&v1984).unwrap();

        let inside = entry_key(&v1984, None, &CompositeKey::new("zzz", "zzz"));
        let outside = entry_key(&v1985, None, &CompositeKey::new("a", "a"));
        assert!(inside.as_slice() >= v1984.as_slice() && inside < end);
        assert!(outside >= end);
    }

    #[test]
    fn test_string_prefix_range_excludes_longer_values() {
        let short = encode_value(&json!("Rock")).unwrap();
        let long = encode_value(&json!("Rocks")).unwrap();
        let end = increment_bytes(&short).unwrap();
        let entry = entry_key(&long, None, &CompositeKey::new("a", "b"));
        assert!(!(entry.as_slice() >= short.as_slice() && entry < end));
    }

    #[test]
    fn test_increment_bytes() {
        assert_eq!(increment_bytes(&[0x01, 0x02]), Some(vec![0x01, 0x03]));
        assert_eq!(increment_bytes(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(increment_bytes(&[0xFF, 0xFF]), None);
    }
}
