//! Migration Pipeline
//!
//! Batch loading of a JSON corpus into the knowledge graph: every item
//! is ingested individually, then every unordered pair is scored by
//! the similarity engine and the resulting relations are written as
//! edges. The pipeline is error tolerant: a malformed file, an item
//! whose ingestion fails, an unanalyzable pair, or a single edge write
//! failure skips that unit, bumps a counter, and moves on. Nothing
//! short of failing to open the database aborts a run.

use crate::db::GraphStore;
use crate::models::ItemFacets;
use crate::services::error::GraphServiceError;
use crate::services::graph_updater::GraphUpdater;
use crate::services::identity::identify;
use crate::services::similarity::{analyze_pair_with, SimilarityThresholds};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    /// JSON files successfully loaded from the source directory.
    pub files_loaded: usize,
    /// Files that could not be read or parsed.
    pub file_failures: usize,
    /// Items ingested into the graph.
    pub items_ingested: usize,
    /// Items skipped because ingestion failed.
    pub item_failures: usize,
    /// Unordered pairs compared by the similarity engine.
    pub pairs_compared: usize,
    /// Pairs skipped because analysis failed (bad timestamp etc).
    pub pair_failures: usize,
    /// Relation edges written from pair analysis.
    pub edges_written: usize,
    /// Relation edges whose write failed.
    pub edge_failures: usize,
}

/// Batch corpus-to-graph migration
pub struct MigrationPipeline {
    store: GraphStore,
    updater: GraphUpdater,
    thresholds: SimilarityThresholds,
}

impl MigrationPipeline {
    pub fn new(store: GraphStore) -> Self {
        Self::with_thresholds(store, SimilarityThresholds::default())
    }

    pub fn with_thresholds(store: GraphStore, thresholds: SimilarityThresholds) -> Self {
        let updater = GraphUpdater::new(store.clone());
        Self {
            store,
            updater,
            thresholds,
        }
    }

    /// Load every `*.json` file under `dir`, recursively.
    ///
    /// Each file contributes its parsed document as one item (a
    /// top-level array is itself a valid item). Unreadable or
    /// unparsable files are logged, counted, and skipped.
    pub fn load_items(
        dir: impl AsRef<Path>,
        summary: &mut MigrationSummary,
    ) -> Result<Vec<Value>, GraphServiceError> {
        let mut files = Vec::new();
        collect_json_files(dir.as_ref(), &mut files)?;
        files.sort();

        let mut items = Vec::new();
        for path in files {
            let parsed = fs::read_to_string(&path)
                .map_err(|e| GraphServiceError::invalid_item(e.to_string()))
                .and_then(|text| {
                    serde_json::from_str::<Value>(&text).map_err(GraphServiceError::from)
                });
            match parsed {
                Ok(value) => {
                    summary.files_loaded += 1;
                    items.push(value);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable JSON file");
                    summary.file_failures += 1;
                }
            }
        }

        Ok(items)
    }

    /// Migrate a batch of items: ingest each, then compare every
    /// unordered pair and write the resulting relation edges.
    ///
    /// Any failure (data or storage) is confined to its unit: the
    /// item, the pair, or the single edge write. The batch always
    /// runs to completion and returns its summary.
    pub async fn run(&self, items: &[Value]) -> Result<MigrationSummary, GraphServiceError> {
        let mut summary = MigrationSummary::default();
        self.run_with_summary(items, &mut summary).await;
        Ok(summary)
    }

    async fn run_with_summary(&self, items: &[Value], summary: &mut MigrationSummary) {
        for (index, item) in items.iter().enumerate() {
            match self.updater.ingest(item).await {
                Ok(_) => summary.items_ingested += 1,
                Err(e) => {
                    warn!(index, error = %e, "skipping item that failed ingestion");
                    summary.item_failures += 1;
                }
            }
        }

        let facets: Vec<ItemFacets> = items.iter().map(ItemFacets::from_value).collect();
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                summary.pairs_compared += 1;
                match analyze_pair_with(&facets[i], &facets[j], &self.thresholds) {
                    Ok(relations) => {
                        let source = identify(&items[i]);
                        let target = identify(&items[j]);
                        for relation in relations {
                            let written = self
                                .store
                                .upsert_edge(
                                    source.as_str(),
                                    target.as_str(),
                                    &relation.relationship_type,
                                    relation.strength,
                                )
                                .await;
                            match written {
                                Ok(()) => summary.edges_written += 1,
                                Err(e) => {
                                    warn!(
                                        i, j,
                                        relationship_type = %relation.relationship_type,
                                        error = %e,
                                        "skipping edge that failed to write"
                                    );
                                    summary.edge_failures += 1;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!(i, j, error = %e, "skipping pair that failed analysis");
                        summary.pair_failures += 1;
                    }
                }
            }
        }

        info!(
            ingested = summary.items_ingested,
            item_failures = summary.item_failures,
            pairs = summary.pairs_compared,
            edges = summary.edges_written,
            edge_failures = summary.edge_failures,
            "migration batch complete"
        );
    }

    /// Load a directory of JSON files and migrate its items.
    pub async fn run_directory(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<MigrationSummary, GraphServiceError> {
        let mut summary = MigrationSummary::default();
        let items = Self::load_items(dir, &mut summary)?;
        self.run_with_summary(&items, &mut summary).await;
        Ok(summary)
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), GraphServiceError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| GraphServiceError::invalid_item(format!("{}: {e}", dir.display())))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| GraphServiceError::invalid_item(format!("{}: {e}", dir.display())))?;
        let path = entry.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseService;
    use crate::models::relationship;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_pipeline() -> (MigrationPipeline, GraphStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            DatabaseService::new(temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let store = GraphStore::new(db);
        (MigrationPipeline::new(store.clone()), store, temp_dir)
    }

    #[tokio::test]
    async fn run_ingests_items_and_writes_pair_edges() {
        let (pipeline, store, _temp_dir) = create_test_pipeline().await;

        let items = vec![
            json!({"content": "sleep hygiene and deep rest", "tags": ["sleep"]}),
            json!({"content": "deep rest improves sleep hygiene", "tags": ["sleep", "health"]}),
        ];
        let summary = pipeline.run(&items).await.unwrap();

        assert_eq!(summary.items_ingested, 2);
        assert_eq!(summary.pairs_compared, 1);
        assert!(summary.edges_written >= 2);
        assert_eq!(summary.edge_failures, 0);

        let source = identify(&items[0]);
        let target = identify(&items[1]);
        let content_edge = store
            .get_edge(
                source.as_str(),
                target.as_str(),
                relationship::SIMILAR_CONTENT,
            )
            .await
            .unwrap();
        assert!(content_edge.is_some());
        let tag_edge = store
            .get_edge(source.as_str(), target.as_str(), relationship::SHARED_TAGS)
            .await
            .unwrap();
        assert!(tag_edge.is_some());
    }

    #[tokio::test]
    async fn run_skips_pairs_with_bad_timestamps() {
        let (pipeline, _store, _temp_dir) = create_test_pipeline().await;

        let items = vec![
            json!({"content": "a b c", "timestamp": "not-a-date"}),
            json!({"content": "a b c", "timestamp": "2025-03-01T10:00:00Z"}),
            json!({"content": "unrelated words entirely"}),
        ];
        let summary = pipeline.run(&items).await.unwrap();

        assert_eq!(summary.items_ingested, 3);
        assert_eq!(summary.pairs_compared, 3);
        // Only the pair where both items carry a timestamp hits the
        // malformed value.
        assert_eq!(summary.pair_failures, 1);
    }

    #[tokio::test]
    async fn run_survives_storage_failures() {
        let (pipeline, store, _temp_dir) = create_test_pipeline().await;

        // Drop the edges table out from under the pipeline so every
        // edge write fails.
        let conn = store.database().connect_with_timeout().await.unwrap();
        conn.execute("DROP TABLE edges", ()).await.unwrap();

        let items = vec![
            json!({"content": "sleep hygiene and deep rest", "tags": ["sleep"]}),
            json!({"content": "deep rest improves sleep hygiene", "tags": ["sleep", "health"]}),
            json!({"content": "unrelated words entirely"}),
        ];
        let summary = pipeline.run(&items).await.unwrap();

        // Ingestion writes RELATED_TO edges, so every item fails; the
        // batch still compares every pair and counts each failed edge
        // write instead of aborting.
        assert_eq!(summary.items_ingested, 0);
        assert_eq!(summary.item_failures, 3);
        assert_eq!(summary.pairs_compared, 3);
        assert_eq!(summary.edges_written, 0);
        assert!(summary.edge_failures >= 2);
    }

    #[tokio::test]
    async fn run_directory_tolerates_malformed_files() {
        let (pipeline, _store, _temp_dir) = create_test_pipeline().await;

        let data_dir = TempDir::new().unwrap();
        let nested = data_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();

        for i in 0..97 {
            let path = data_dir.path().join(format!("item_{i:03}.json"));
            fs::write(path, format!(r#"{{"content": "unique item {i}"}}"#)).unwrap();
        }
        fs::write(nested.join("bad_1.json"), "{not json").unwrap();
        fs::write(nested.join("bad_2.json"), "").unwrap();
        fs::write(nested.join("bad_3.json"), "[1, 2,").unwrap();
        // Non-JSON files are not corpus members.
        fs::write(data_dir.path().join("README.md"), "notes").unwrap();

        let summary = pipeline.run_directory(data_dir.path()).await.unwrap();

        assert_eq!(summary.files_loaded, 97);
        assert_eq!(summary.file_failures, 3);
        assert_eq!(summary.items_ingested, 97);
        assert_eq!(summary.item_failures, 0);
        assert_eq!(summary.pairs_compared, 97 * 96 / 2);
    }

    #[tokio::test]
    async fn load_items_keeps_one_item_per_file() {
        let data_dir = TempDir::new().unwrap();
        // An array document is a single item, not a batch of elements.
        fs::write(
            data_dir.path().join("array.json"),
            r#"[{"content": "one"}, {"content": "two"}]"#,
        )
        .unwrap();
        fs::write(data_dir.path().join("single.json"), r#"{"content": "three"}"#).unwrap();

        let mut summary = MigrationSummary::default();
        let items = MigrationPipeline::load_items(data_dir.path(), &mut summary).unwrap();

        assert_eq!(summary.files_loaded, 2);
        assert_eq!(items.len(), 2);
        assert!(items[0].is_array());
    }

    #[tokio::test]
    async fn load_items_errors_on_missing_directory() {
        let mut summary = MigrationSummary::default();
        let result = MigrationPipeline::load_items("/nonexistent/graphkb-data", &mut summary);
        assert!(result.is_err());
    }
}
