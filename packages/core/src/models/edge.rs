//! Graph Edge and Relation Types
//!
//! This module defines the persisted graph records: weighted typed
//! [`Edge`]s between nodes, per-node [`NodeAttribute`]s, and
//! containment [`HierarchyEdge`]s.
//!
//! # Identity and Uniqueness
//!
//! Node ids are opaque strings, usually content hashes produced by
//! [`crate::services::identity::identify`], but concept keys are stored
//! in the same id space (see `GraphUpdater`). Edges are unique on
//! `(source_id, target_id, relationship_type)`; re-asserting an edge
//! replaces its strength and nothing else.
//!
//! # Relationship Types
//!
//! The relationship type is an open string tag, not a closed enum: the
//! store accepts arbitrary type strings. The constants in
//! [`relationship`] name the types the built-in components emit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relationship types emitted by the built-in components.
///
/// These are conventions, not an exhaustive set; the store accepts
/// any type string.
pub mod relationship {
    /// Item → concept key, strength 1.0 (graph updater).
    pub const RELATED_TO: &str = "RELATED_TO";
    /// Item → related prior item, strength = similarity score.
    pub const SIMILAR_TO: &str = "SIMILAR_TO";
    /// Pairwise content Jaccard above threshold.
    pub const SIMILAR_CONTENT: &str = "SIMILAR_CONTENT";
    /// Pairwise tag-set Jaccard above zero.
    pub const SHARED_TAGS: &str = "SHARED_TAGS";
    /// Pairwise title Jaccard above threshold.
    pub const RELATED_TOPIC: &str = "RELATED_TOPIC";
    /// Timestamps within one hour.
    pub const TEMPORALLY_CLOSE: &str = "TEMPORALLY_CLOSE";
    /// Timestamps within one day.
    pub const SAME_DAY: &str = "SAME_DAY";
    /// Timestamps within one week.
    pub const SAME_WEEK: &str = "SAME_WEEK";
}

/// A typed relation with its strength, as produced by pairwise
/// analysis before it is attached to a concrete node pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Relationship type tag (see [`relationship`]).
    pub relationship_type: String,

    /// Similarity-like strength, by convention in `[0, 1]`. Not
    /// mechanically clamped; producers compute within range.
    pub strength: f64,
}

impl Relation {
    pub fn new(relationship_type: impl Into<String>, strength: f64) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            strength,
        }
    }
}

/// A persisted edge row.
///
/// `strength` carries the similarity-like weight; `confidence`,
/// `bidirectional`, the validity window, and `metadata` are optional
/// qualifiers kept for schema compatibility and written through
/// [`crate::db::EdgeSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Row id (storage-assigned).
    pub id: i64,
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: String,
    pub strength: f64,
    pub confidence: f64,
    pub bidirectional: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of a neighbor query result.
///
/// Direction is deliberately erased: `node_id` is "the other end"
/// whether the queried node was stored as source or as target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub node_id: String,
    pub relationship_type: String,
    pub strength: f64,
}

/// A persisted node attribute.
///
/// Primary key is `(node_id, attribute_name)`; re-asserting an
/// attribute overwrites its value and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttribute {
    pub node_id: String,
    pub attribute_name: String,
    pub attribute_value: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted hierarchy (containment / is-a) relation, distinct from
/// the weighted similarity edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub parent_id: String,
    pub child_id: String,
    pub hierarchy_type: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
