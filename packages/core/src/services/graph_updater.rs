//! Graph Updater
//!
//! Per-item ingestion: computes the item's [`NodeId`], extracts its
//! concept keys, and links the item to each concept with a
//! `RELATED_TO` edge. A second phase asks a pluggable
//! [`RelatedItemFinder`] for previously-known related items and links
//! them with `SIMILAR_TO` edges scaled by the similarity score.
//!
//! # Concept keys
//!
//! Concepts are the item's own structure: an object contributes its
//! field names, an array its stringified indices, a string itself;
//! anything else contributes nothing. Concept keys are used as target
//! ids directly, sharing the id space with content hashes; a
//! deliberate simplification (see DESIGN.md).

use crate::db::GraphStore;
use crate::models::relationship;
use crate::services::error::GraphServiceError;
use crate::services::identity::{identify, NodeId};
use crate::services::similarity::content_similarity;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Strategy for locating previously-known items related to a new one.
///
/// Implementations may consult the store, an in-memory corpus, or an
/// external index; each returned `(id, score)` becomes a `SIMILAR_TO`
/// edge.
#[async_trait]
pub trait RelatedItemFinder: Send + Sync {
    async fn find_related(
        &self,
        item: &Value,
    ) -> Result<Vec<(NodeId, f64)>, GraphServiceError>;
}

/// The default finder: knows no prior items and finds nothing.
#[derive(Debug, Default)]
pub struct NoRelatedItems;

#[async_trait]
impl RelatedItemFinder for NoRelatedItems {
    async fn find_related(
        &self,
        _item: &Value,
    ) -> Result<Vec<(NodeId, f64)>, GraphServiceError> {
        Ok(Vec::new())
    }
}

/// Content-similarity nearest neighbors over a registered corpus.
///
/// Holds the corpus in memory; each query scores the new item's
/// `content` facet against every registered item and keeps scores at
/// or above the floor.
pub struct CorpusSimilarityFinder {
    corpus: Vec<(NodeId, Value)>,
    floor: f64,
}

impl CorpusSimilarityFinder {
    pub fn new(floor: f64) -> Self {
        Self {
            corpus: Vec::new(),
            floor,
        }
    }

    /// Register a prior item, returning its id.
    pub fn register(&mut self, item: &Value) -> NodeId {
        let id = identify(item);
        self.corpus.push((id.clone(), item.clone()));
        id
    }

    fn content_of(item: &Value) -> Option<&Value> {
        item.as_object().and_then(|obj| obj.get("content"))
    }
}

#[async_trait]
impl RelatedItemFinder for CorpusSimilarityFinder {
    async fn find_related(
        &self,
        item: &Value,
    ) -> Result<Vec<(NodeId, f64)>, GraphServiceError> {
        let Some(query_content) = Self::content_of(item) else {
            return Ok(Vec::new());
        };
        let query_id = identify(item);

        let mut related = Vec::new();
        for (id, prior) in &self.corpus {
            if *id == query_id {
                continue;
            }
            let Some(prior_content) = Self::content_of(prior) else {
                continue;
            };
            let score = content_similarity(query_content, prior_content);
            if score >= self.floor {
                related.push((id.clone(), score));
            }
        }

        Ok(related)
    }
}

/// Extract the concept keys of an item.
///
/// Object: its field names; array: stringified indices; string: the
/// string itself as its sole concept; any other type: empty.
pub fn extract_key_concepts(item: &Value) -> Vec<String> {
    match item {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Per-item ingestion into the knowledge graph
pub struct GraphUpdater {
    store: GraphStore,
    finder: Arc<dyn RelatedItemFinder>,
}

impl GraphUpdater {
    /// An updater with the default (no-op) related-item finder.
    pub fn new(store: GraphStore) -> Self {
        Self::with_finder(store, Arc::new(NoRelatedItems))
    }

    pub fn with_finder(store: GraphStore, finder: Arc<dyn RelatedItemFinder>) -> Self {
        Self { store, finder }
    }

    /// Ingest one item: hash it, link it to each of its concept keys
    /// with `RELATED_TO` strength 1.0, and to each related prior item
    /// with `SIMILAR_TO` at the finder's score.
    ///
    /// Idempotent: re-ingesting the same item upserts the same edges.
    pub async fn ingest(&self, item: &Value) -> Result<NodeId, GraphServiceError> {
        let id = identify(item);

        let concepts = extract_key_concepts(item);
        for concept in &concepts {
            self.store
                .upsert_edge(id.as_str(), concept, relationship::RELATED_TO, 1.0)
                .await?;
        }

        let related = self.finder.find_related(item).await?;
        for (related_id, score) in &related {
            self.store
                .upsert_edge(
                    id.as_str(),
                    related_id.as_str(),
                    relationship::SIMILAR_TO,
                    *score,
                )
                .await?;
        }

        debug!(
            node_id = %id,
            concepts = concepts.len(),
            related = related.len(),
            "ingested item into knowledge graph"
        );

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseService;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_updater() -> (GraphStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            DatabaseService::new(temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        (GraphStore::new(db), temp_dir)
    }

    #[test]
    fn concepts_of_object_are_field_names() {
        let concepts = extract_key_concepts(&json!({"title": "t", "content": "c"}));
        assert_eq!(concepts, vec!["content".to_string(), "title".to_string()]);
    }

    #[test]
    fn concepts_of_array_are_indices() {
        let concepts = extract_key_concepts(&json!(["a", "b", "c"]));
        assert_eq!(concepts, vec!["0", "1", "2"]);
    }

    #[test]
    fn concepts_of_string_is_itself() {
        assert_eq!(
            extract_key_concepts(&json!("insomnia")),
            vec!["insomnia".to_string()]
        );
    }

    #[test]
    fn concepts_of_scalars_are_empty() {
        assert!(extract_key_concepts(&json!(42)).is_empty());
        assert!(extract_key_concepts(&json!(null)).is_empty());
    }

    #[tokio::test]
    async fn ingest_links_item_to_concepts() {
        let (store, _temp_dir) = create_test_updater().await;
        let updater = GraphUpdater::new(store.clone());

        let item = json!({"title": "Sleep", "content": "Sleep matters"});
        let id = updater.ingest(&item).await.unwrap();

        let neighbors = store
            .neighbors(id.as_str(), Some(relationship::RELATED_TO))
            .await
            .unwrap();
        assert_eq!(neighbors.len(), 2);
        let targets: Vec<&str> = neighbors.iter().map(|n| n.node_id.as_str()).collect();
        assert!(targets.contains(&"title"));
        assert!(targets.contains(&"content"));
        assert!(neighbors.iter().all(|n| n.strength == 1.0));
    }

    #[tokio::test]
    async fn ingest_is_idempotent() {
        let (store, _temp_dir) = create_test_updater().await;
        let updater = GraphUpdater::new(store.clone());

        let item = json!({"a": 1, "b": 2});
        let first = updater.ingest(&item).await.unwrap();
        let second = updater.ingest(&item).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.edge_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ingest_with_corpus_finder_adds_similar_to_edges() {
        let (store, _temp_dir) = create_test_updater().await;

        let prior = json!({"content": "deep sleep and recovery"});
        let mut finder = CorpusSimilarityFinder::new(0.2);
        let prior_id = finder.register(&prior);

        let updater = GraphUpdater::with_finder(store.clone(), Arc::new(finder));
        let id = updater
            .ingest(&json!({"content": "sleep and recovery habits"}))
            .await
            .unwrap();

        let similar = store
            .neighbors(id.as_str(), Some(relationship::SIMILAR_TO))
            .await
            .unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].node_id, prior_id.as_str());
        assert!(similar[0].strength > 0.2 && similar[0].strength <= 1.0);
    }

    #[tokio::test]
    async fn corpus_finder_skips_the_item_itself() {
        let item = json!({"content": "identical item"});
        let mut finder = CorpusSimilarityFinder::new(0.0);
        finder.register(&item);

        let related = finder.find_related(&item).await.unwrap();
        assert!(related.is_empty());
    }
}
