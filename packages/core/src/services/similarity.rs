//! Similarity Engine
//!
//! Pure functions scoring two items on content overlap, tag overlap,
//! title overlap, and temporal distance, plus [`analyze_pair`], which
//! runs whichever scorers apply based on facet presence in *both*
//! items and filters the results through inclusion thresholds.
//!
//! All scorers are total over their input domain: Jaccard similarity
//! of two empty sets is 0, never NaN. The only failure mode is a
//! timestamp that does not parse as ISO-8601, which is a data error.
//!
//! # Examples
//!
//! ```rust
//! use graphkb_core::models::ItemFacets;
//! use graphkb_core::services::similarity::analyze_pair;
//! use serde_json::json;
//!
//! let a = ItemFacets::from_value(&json!({
//!     "content": "X is great", "tags": ["x", "intro"]
//! }));
//! let b = ItemFacets::from_value(&json!({
//!     "content": "X is great for Y", "tags": ["x", "y"]
//! }));
//!
//! let relations = analyze_pair(&a, &b).unwrap();
//! assert_eq!(relations.len(), 2); // SIMILAR_CONTENT + SHARED_TAGS
//! ```

use crate::models::{relationship, ItemFacets, Relation};
use crate::services::error::GraphServiceError;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Seconds in one hour / one day / one week - the temporal buckets.
const HOUR_SECS: i64 = 3_600;
const DAY_SECS: i64 = 86_400;
const WEEK_SECS: i64 = 604_800;

fn word_regex() -> &'static Regex {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    WORD_REGEX.get_or_init(|| Regex::new(r"\w+").unwrap())
}

/// Inclusion thresholds applied by [`analyze_pair`].
///
/// The defaults are fixed design choices; callers needing different
/// cut points can construct their own and use
/// [`analyze_pair_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityThresholds {
    /// Content similarity must exceed this to be included.
    pub content: f64,
    /// Tag similarity must exceed this to be included.
    pub tags: f64,
    /// Title similarity must exceed this to be included.
    pub title: f64,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            content: 0.3,
            tags: 0.0,
            title: 0.5,
        }
    }
}

/// Flatten a `content` value to comparable text.
///
/// Strings pass through; objects contribute their string-valued
/// fields, arrays their string elements; anything else contributes
/// nothing.
fn extract_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .values()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Lowercased word tokens of a text.
fn token_set(text: &str) -> HashSet<String> {
    word_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Jaccard similarity of two sets; 0 when both are empty.
fn jaccard<T: std::hash::Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let common = a.intersection(b).count();
    common as f64 / union as f64
}

/// Content similarity: Jaccard over lowercased word tokens of the
/// flattened text representation. Always in `[0, 1]`.
pub fn content_similarity(a: &Value, b: &Value) -> f64 {
    jaccard(&token_set(&extract_text(a)), &token_set(&extract_text(b)))
}

/// Tag similarity: Jaccard over the tag sets, exact string match,
/// case-sensitive. Always in `[0, 1]`.
pub fn tag_similarity(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    jaccard(&set_a, &set_b)
}

/// Title similarity: the same Jaccard-over-tokens method as content
/// similarity, applied to title strings.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

/// Parse an ISO-8601 timestamp.
///
/// RFC-3339 values keep their offset; offset-naive values
/// (`2023-05-01T10:00:00`) are accepted and treated as UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, GraphServiceError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_error) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| GraphServiceError::invalid_timestamp(value, rfc_error)),
    }
}

/// Temporal relation of two timestamps, bucketed by absolute
/// difference:
///
/// - under an hour: `TEMPORALLY_CLOSE`, strength 0.9
/// - under a day: `SAME_DAY`, strength 0.7
/// - under a week: `SAME_WEEK`, strength 0.5
/// - otherwise: no relation (`Ok(None)`, absent rather than
///   zero-strength)
pub fn temporal_relation(a: &str, b: &str) -> Result<Option<Relation>, GraphServiceError> {
    let t1 = parse_timestamp(a)?;
    let t2 = parse_timestamp(b)?;
    let diff = (t2 - t1).num_seconds().abs();

    let relation = if diff < HOUR_SECS {
        Some(Relation::new(relationship::TEMPORALLY_CLOSE, 0.9))
    } else if diff < DAY_SECS {
        Some(Relation::new(relationship::SAME_DAY, 0.7))
    } else if diff < WEEK_SECS {
        Some(Relation::new(relationship::SAME_WEEK, 0.5))
    } else {
        None
    };

    Ok(relation)
}

/// Pairwise analysis with the default thresholds.
pub fn analyze_pair(
    a: &ItemFacets,
    b: &ItemFacets,
) -> Result<Vec<Relation>, GraphServiceError> {
    analyze_pair_with(a, b, &SimilarityThresholds::default())
}

/// Run every scorer whose facet is present on *both* sides and return
/// the relations that pass their inclusion thresholds.
///
/// The result may be empty (no comparable facets, or nothing passed)
/// and may carry multiple relation types for one pair. A malformed
/// timestamp aborts the analysis of this pair with a data error.
pub fn analyze_pair_with(
    a: &ItemFacets,
    b: &ItemFacets,
    thresholds: &SimilarityThresholds,
) -> Result<Vec<Relation>, GraphServiceError> {
    let mut relations = Vec::new();

    if let (Some(content_a), Some(content_b)) = (&a.content, &b.content) {
        let score = content_similarity(content_a, content_b);
        if score > thresholds.content {
            relations.push(Relation::new(relationship::SIMILAR_CONTENT, score));
        }
    }

    if let (Some(tags_a), Some(tags_b)) = (&a.tags, &b.tags) {
        let score = tag_similarity(tags_a, tags_b);
        if score > thresholds.tags {
            relations.push(Relation::new(relationship::SHARED_TAGS, score));
        }
    }

    if let (Some(title_a), Some(title_b)) = (&a.title, &b.title) {
        let score = title_similarity(title_a, title_b);
        if score > thresholds.title {
            relations.push(Relation::new(relationship::RELATED_TOPIC, score));
        }
    }

    if let (Some(ts_a), Some(ts_b)) = (&a.timestamp, &b.timestamp) {
        if let Some(relation) = temporal_relation(ts_a, ts_b)? {
            relations.push(relation);
        }
    }

    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facets(value: serde_json::Value) -> ItemFacets {
        ItemFacets::from_value(&value)
    }

    #[test]
    fn jaccard_of_empty_sets_is_zero() {
        assert_eq!(content_similarity(&json!(""), &json!("")), 0.0);
        assert_eq!(tag_similarity(&[], &[]), 0.0);
        assert_eq!(title_similarity("", ""), 0.0);
    }

    #[test]
    fn content_similarity_is_case_insensitive_and_bounded() {
        let score = content_similarity(&json!("Python IS great"), &json!("python is great"));
        assert_eq!(score, 1.0);

        let score = content_similarity(&json!("alpha beta"), &json!("gamma delta"));
        assert_eq!(score, 0.0);
    }

    #[test]
    fn content_extraction_flattens_objects_and_arrays() {
        // Object: string-valued fields only; array: string elements only.
        let a = json!({"summary": "sleep quality", "count": 7});
        let b = json!(["sleep", "quality", 42]);
        let score = content_similarity(&a, &b);
        assert!(score > 0.9);

        // Non-string content contributes nothing.
        assert_eq!(content_similarity(&json!(123), &json!(123)), 0.0);
    }

    #[test]
    fn tag_similarity_is_case_sensitive() {
        let a = vec!["Python".to_string()];
        let b = vec!["python".to_string()];
        assert_eq!(tag_similarity(&a, &b), 0.0);

        let c = vec!["python".to_string(), "intro".to_string()];
        let d = vec!["python".to_string()];
        assert_eq!(tag_similarity(&c, &d), 0.5);
    }

    #[test]
    fn temporal_relation_buckets() {
        let base = "2023-05-01T10:00:00Z";

        let close = temporal_relation(base, "2023-05-01T10:30:00Z").unwrap().unwrap();
        assert_eq!(close.relationship_type, relationship::TEMPORALLY_CLOSE);
        assert_eq!(close.strength, 0.9);

        let same_day = temporal_relation(base, "2023-05-01T22:00:00Z").unwrap().unwrap();
        assert_eq!(same_day.relationship_type, relationship::SAME_DAY);
        assert_eq!(same_day.strength, 0.7);

        let same_week = temporal_relation(base, "2023-05-05T10:00:00Z").unwrap().unwrap();
        assert_eq!(same_week.relationship_type, relationship::SAME_WEEK);
        assert_eq!(same_week.strength, 0.5);

        // Beyond a week: absent, not zero-strength.
        assert!(temporal_relation(base, "2023-06-01T10:00:00Z").unwrap().is_none());
    }

    #[test]
    fn temporal_relation_accepts_explicit_offsets() {
        // +02:00 at noon equals 10:00Z.
        let relation = temporal_relation("2023-05-01T10:00:00Z", "2023-05-01T12:00:00+02:00")
            .unwrap()
            .unwrap();
        assert_eq!(relation.relationship_type, relationship::TEMPORALLY_CLOSE);
    }

    #[test]
    fn temporal_relation_accepts_offset_naive_timestamps() {
        // No offset: treated as UTC.
        let relation = temporal_relation("2023-05-01T10:00:00", "2023-05-01T10:30:00")
            .unwrap()
            .unwrap();
        assert_eq!(relation.relationship_type, relationship::TEMPORALLY_CLOSE);

        // Naive and offset-qualified values compare on the same axis.
        let relation = temporal_relation("2023-05-01T10:00:00.500", "2023-05-01T10:00:00Z")
            .unwrap()
            .unwrap();
        assert_eq!(relation.relationship_type, relationship::TEMPORALLY_CLOSE);
    }

    #[test]
    fn temporal_relation_rejects_malformed_timestamps() {
        let err = temporal_relation("yesterday", "2023-05-01T10:00:00Z").unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn analyze_pair_combines_multiple_relation_types() {
        let a = facets(json!({
            "title": "Intro to X",
            "content": "X is great",
            "tags": ["x", "intro"],
            "timestamp": "2023-05-01T10:00:00Z"
        }));
        let b = facets(json!({
            "title": "X for Y",
            "content": "X is great for Y",
            "tags": ["x", "y"],
            "timestamp": "2023-05-01T10:30:00Z"
        }));

        let relations = analyze_pair(&a, &b).unwrap();
        let types: Vec<&str> = relations
            .iter()
            .map(|r| r.relationship_type.as_str())
            .collect();

        // Content Jaccard 3/5 = 0.6 > 0.3; shared tag "x" 1/3 > 0;
        // 30 minutes apart. Title overlap is 1/5 = 0.2 <= 0.5, so no
        // RELATED_TOPIC.
        assert_eq!(
            types,
            vec![
                relationship::SIMILAR_CONTENT,
                relationship::SHARED_TAGS,
                relationship::TEMPORALLY_CLOSE
            ]
        );

        let content = &relations[0];
        assert!((content.strength - 0.6).abs() < 1e-9);
    }

    #[test]
    fn analyze_pair_with_disjoint_facets_is_empty() {
        let a = facets(json!({"content": "only content here"}));
        let b = facets(json!({"tags": ["only", "tags"]}));

        assert!(analyze_pair(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn analyze_pair_thresholds_are_exclusive() {
        // One shared token out of five total sits at 0.2 <= 0.5,
        // below the title threshold.
        let a = facets(json!({"title": "sleep hygiene basics"}));
        let b = facets(json!({"title": "sleep routine tips"}));
        assert!(analyze_pair(&a, &b).unwrap().is_empty());

        // Tag threshold is exclusive at zero: disjoint tags produce
        // nothing even though both facets are present.
        let c = facets(json!({"tags": ["a"]}));
        let d = facets(json!({"tags": ["b"]}));
        assert!(analyze_pair(&c, &d).unwrap().is_empty());
    }

    #[test]
    fn analyze_pair_custom_thresholds() {
        let a = facets(json!({"title": "sleep hygiene basics"}));
        let b = facets(json!({"title": "sleep routine tips"}));

        let permissive = SimilarityThresholds {
            title: 0.1,
            ..Default::default()
        };
        let relations = analyze_pair_with(&a, &b, &permissive).unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].relationship_type, relationship::RELATED_TOPIC);
    }

    #[test]
    fn analyze_pair_propagates_timestamp_errors() {
        let a = facets(json!({"timestamp": "not-a-time"}));
        let b = facets(json!({"timestamp": "2023-05-01T10:00:00Z"}));

        assert!(analyze_pair(&a, &b).unwrap_err().is_data_error());
    }
}
