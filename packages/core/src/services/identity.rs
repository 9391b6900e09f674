//! Identity Hasher
//!
//! Deterministic content-addressing for arbitrary JSON-like values.
//! An item's [`NodeId`] is the SHA-256 digest of its canonical
//! serialization: object keys sorted recursively, compact separators,
//! string content untouched (no whitespace or case normalization
//! inside values).
//!
//! Two items with identical content after canonicalization collide to
//! the same id: intentional deduplication, not a bug.
//!
//! # Examples
//!
//! ```rust
//! use graphkb_core::services::identity::identify;
//! use serde_json::json;
//!
//! let a = json!({"title": "Intro", "tags": ["x"]});
//! let b = json!({"tags": ["x"], "title": "Intro"});
//!
//! // Key order does not matter...
//! assert_eq!(identify(&a), identify(&b));
//!
//! // ...but string content does, byte for byte.
//! let c = json!({"title": "Intro ", "tags": ["x"]});
//! assert_ne!(identify(&a), identify(&c));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-derived node identifier: lowercase hex SHA-256 of the
/// canonical serialization.
///
/// Concept keys produced by the graph updater live in the same id
/// space as these hashes (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the stable identity of an item.
///
/// Pure and total over `serde_json::Value`: the input type closes the
/// "unsupported value type" failure mode at compile time, so there is
/// nothing to propagate.
pub fn identify(item: &Value) -> NodeId {
    let canonical = canonical_json(item);
    let digest = Sha256::digest(canonical.as_bytes());
    NodeId(hex::encode(digest))
}

/// Canonical serialization: compact JSON with object keys sorted
/// recursively.
///
/// Equivalent values serialize identically regardless of construction
/// order; any differing field, including whitespace inside string
/// values, produces different output.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Value's Display performs JSON string escaping.
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identify_is_deterministic() {
        let item = json!({"content": "X is great", "tags": ["x"]});
        assert_eq!(identify(&item), identify(&item));
    }

    #[test]
    fn identify_ignores_key_order() {
        let a = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let b = json!({"a": {"c": 3, "d": 2}, "b": 1});
        assert_eq!(identify(&a), identify(&b));
    }

    #[test]
    fn identify_distinguishes_string_whitespace() {
        let a = json!({"content": "x y"});
        let b = json!({"content": "x  y"});
        assert_ne!(identify(&a), identify(&b));
    }

    #[test]
    fn identify_distinguishes_any_field_change() {
        let a = json!({"tags": ["x", "y"]});
        let b = json!({"tags": ["y", "x"]});
        // Array order is part of the content.
        assert_ne!(identify(&a), identify(&b));
    }

    #[test]
    fn identify_covers_all_item_shapes() {
        // Objects, arrays, and bare strings are all addressable.
        let ids = [
            identify(&json!({"k": "v"})),
            identify(&json!(["a", "b"])),
            identify(&json!("just text")),
            identify(&json!(null)),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let value = json!({"z": {"b": 1, "a": [{"y": 2, "x": 3}]}});
        assert_eq!(
            canonical_json(&value),
            r#"{"z":{"a":[{"x":3,"y":2}],"b":1}}"#
        );
    }

    #[test]
    fn node_id_is_fixed_length_hex() {
        let id = identify(&json!("anything"));
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
