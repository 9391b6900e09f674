//! Information Item Types
//!
//! An item is an opaque JSON-like value (object, array, or string)
//! representing one unit of ingested information. Items carry no fixed
//! schema; the fields `content`, `tags`, `title`, and `timestamp` are
//! recognized *if present* and drive similarity scoring.
//!
//! # Comparable Facets
//!
//! Rather than inspecting raw JSON at every comparison site, the fields
//! an item can be compared on are extracted once into [`ItemFacets`],
//! an optional-field record. The similarity engine dispatches on
//! presence checks against this record: a comparison runs only when the
//! facet exists on *both* sides of a pair.
//!
//! # Examples
//!
//! ```rust
//! use graphkb_core::models::ItemFacets;
//! use serde_json::json;
//!
//! let item = json!({
//!     "title": "Introduction to Python",
//!     "content": "Python is a high-level programming language...",
//!     "tags": ["programming", "beginner", "python"],
//!     "timestamp": "2023-05-01T10:00:00Z"
//! });
//!
//! let facets = ItemFacets::from_value(&item);
//! assert!(facets.title.is_some());
//! assert_eq!(facets.tags.as_deref(), Some(&["programming".to_string(),
//!     "beginner".to_string(), "python".to_string()][..]));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparable facets of an information item.
///
/// Each field is present only when the underlying item (a JSON object)
/// carries the corresponding key with a usable type. Non-object items
/// (arrays, strings) expose no facets: they can still be ingested and
/// content-addressed, but pairwise analysis has nothing to compare.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFacets {
    /// Raw `content` value; string, object, or array forms all score
    /// (text extraction flattens non-string forms).
    pub content: Option<Value>,

    /// Tag list; only string elements are kept.
    pub tags: Option<Vec<String>>,

    /// Title string.
    pub title: Option<String>,

    /// Timestamp string, expected ISO-8601 (parsed lazily at
    /// comparison time so extraction itself cannot fail).
    pub timestamp: Option<String>,
}

impl ItemFacets {
    /// Extract the comparable facets from an item.
    ///
    /// Fields with unexpected types are treated as absent rather than
    /// erroneous: a numeric `title` simply means the pair has no title
    /// comparison, mirroring the field-presence dispatch of the
    /// ingestion contract.
    pub fn from_value(item: &Value) -> Self {
        let Some(obj) = item.as_object() else {
            return Self::default();
        };

        let content = obj.get("content").cloned();

        let tags = obj.get("tags").and_then(|v| v.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        });

        let title = obj
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let timestamp = obj
            .get("timestamp")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Self {
            content,
            tags,
            title,
            timestamp,
        }
    }

    /// Whether the item exposes any facet at all.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.tags.is_none()
            && self.title.is_none()
            && self.timestamp.is_none()
    }
}
