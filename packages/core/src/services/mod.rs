//! Service Layer
//!
//! Graph-building logic on top of the database layer:
//!
//! - [`identity`]: deterministic content-addressing of JSON items
//! - [`similarity`]: pairwise similarity scoring and relation detection
//! - [`graph_updater`]: per-item ingestion with pluggable related-item
//!   discovery
//! - [`migration`]: error-tolerant batch migration of a JSON corpus

pub mod error;
pub mod graph_updater;
pub mod identity;
pub mod migration;
pub mod similarity;

pub use error::GraphServiceError;
pub use graph_updater::{
    extract_key_concepts, CorpusSimilarityFinder, GraphUpdater, NoRelatedItems, RelatedItemFinder,
};
pub use identity::{canonical_json, identify, NodeId};
pub use migration::{MigrationPipeline, MigrationSummary};
pub use similarity::{analyze_pair, analyze_pair_with, SimilarityThresholds};
