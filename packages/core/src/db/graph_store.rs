//! GraphStore - Model-Level Store over the Graph Tables
//!
//! `GraphStore` wraps [`DatabaseService`] and exposes the graph
//! operations in terms of the crate's models, handling all
//! libsql::Row → model conversion. It owns no cache: every operation
//! is a direct round trip to durable storage, and concurrency safety
//! rests on the storage engine's locking, not on this layer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use graphkb_core::db::{DatabaseService, GraphStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./graphkb.db")).await?);
//!     let store = GraphStore::new(db);
//!
//!     store.upsert_edge("a", "b", "SIMILAR_CONTENT", 0.8).await?;
//!     let neighbors = store.neighbors("b", None).await?;
//!     assert_eq!(neighbors.len(), 1);
//!     Ok(())
//! }
//! ```

use crate::db::database::{DatabaseService, EdgeSpec, TableStatus};
use crate::db::error::DatabaseError;
use crate::models::{Edge, HierarchyEdge, Neighbor, NodeAttribute};
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::Row;
use serde_json::Value;
use std::sync::Arc;

/// Model-level store for edges, node attributes, and hierarchies
#[derive(Debug, Clone)]
pub struct GraphStore {
    db: Arc<DatabaseService>,
}

impl GraphStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// The underlying database handle
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Parse a timestamp column - handles both SQLite and RFC3339 formats
    ///
    /// SQLite CURRENT_TIMESTAMP writes "YYYY-MM-DD HH:MM:SS"; values
    /// written by this crate use RFC3339.
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(DatabaseError::sql_execution(format!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        )))
    }

    fn column_error(name: &str, e: impl std::fmt::Display) -> DatabaseError {
        DatabaseError::sql_execution(format!("Failed to get {}: {}", name, e))
    }

    /// Convert a full edges row to an [`Edge`]
    fn row_to_edge(row: &Row) -> Result<Edge, DatabaseError> {
        let id: i64 = row.get(0).map_err(|e| Self::column_error("id", e))?;
        let source_id: String = row.get(1).map_err(|e| Self::column_error("source_id", e))?;
        let target_id: String = row.get(2).map_err(|e| Self::column_error("target_id", e))?;
        let relationship_type: String = row
            .get(3)
            .map_err(|e| Self::column_error("relationship_type", e))?;
        let strength: f64 = row.get(4).map_err(|e| Self::column_error("strength", e))?;
        let confidence: f64 = row.get(5).map_err(|e| Self::column_error("confidence", e))?;
        let bidirectional: i64 = row
            .get(6)
            .map_err(|e| Self::column_error("bidirectional", e))?;
        let start_time: Option<String> =
            row.get(7).map_err(|e| Self::column_error("start_time", e))?;
        let end_time: Option<String> = row.get(8).map_err(|e| Self::column_error("end_time", e))?;
        let metadata: Option<String> = row.get(9).map_err(|e| Self::column_error("metadata", e))?;
        let created_at: String = row
            .get(10)
            .map_err(|e| Self::column_error("created_at", e))?;
        let updated_at: String = row
            .get(11)
            .map_err(|e| Self::column_error("updated_at", e))?;

        let metadata = metadata
            .map(|m| {
                serde_json::from_str::<Value>(&m).map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to parse edge metadata: {}", e))
                })
            })
            .transpose()?;

        Ok(Edge {
            id,
            source_id,
            target_id,
            relationship_type,
            strength,
            confidence,
            bidirectional: bidirectional != 0,
            start_time: start_time.as_deref().map(Self::parse_timestamp).transpose()?,
            end_time: end_time.as_deref().map(Self::parse_timestamp).transpose()?,
            metadata,
            created_at: Self::parse_timestamp(&created_at)?,
            updated_at: Self::parse_timestamp(&updated_at)?,
        })
    }

    /// Insert or update an edge with default qualifiers
    ///
    /// Confidence defaults to 1.0. Idempotent: applying the same
    /// upsert twice yields one row with the latest strength.
    pub async fn upsert_edge(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
        strength: f64,
    ) -> Result<(), DatabaseError> {
        self.db
            .db_upsert_edge(&EdgeSpec::new(
                source_id,
                target_id,
                relationship_type,
                strength,
            ))
            .await
    }

    /// Insert or update an edge with full qualifiers
    ///
    /// On conflict only `strength` is replaced; confidence, the
    /// bidirectional flag, the validity window, and metadata keep
    /// their first-written values.
    pub async fn upsert_edge_spec(&self, spec: &EdgeSpec<'_>) -> Result<(), DatabaseError> {
        self.db.db_upsert_edge(spec).await
    }

    /// Fetch one edge by its unique `(source, target, type)` key
    ///
    /// Absence is a normal `Ok(None)`, never an error.
    pub async fn get_edge(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
    ) -> Result<Option<Edge>, DatabaseError> {
        match self
            .db
            .db_get_edge(source_id, target_id, relationship_type)
            .await?
        {
            Some(row) => Ok(Some(Self::row_to_edge(&row)?)),
            None => Ok(None),
        }
    }

    /// Total number of edge rows
    pub async fn edge_count(&self) -> Result<u64, DatabaseError> {
        self.db.db_edge_count().await
    }

    /// Edges touching a node, direction erased
    ///
    /// Returns the union of edges where `node_id` is source or target,
    /// restricted to `relationship_type` if given. Each result names
    /// the other end of the edge; the store treats edges as
    /// effectively bidirectional for traversal even though each row
    /// records a fixed source/target for dedup.
    pub async fn neighbors(
        &self,
        node_id: &str,
        relationship_type: Option<&str>,
    ) -> Result<Vec<Neighbor>, DatabaseError> {
        let mut rows = self.db.db_neighbors(node_id, relationship_type).await?;

        let mut neighbors = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            neighbors.push(Neighbor {
                node_id: row.get(0).map_err(|e| Self::column_error("node_id", e))?,
                relationship_type: row
                    .get(1)
                    .map_err(|e| Self::column_error("relationship_type", e))?,
                strength: row.get(2).map_err(|e| Self::column_error("strength", e))?,
            });
        }

        Ok(neighbors)
    }

    /// Assert a node attribute, overwriting any previous value
    pub async fn set_attribute(
        &self,
        node_id: &str,
        attribute_name: &str,
        attribute_value: &str,
        confidence: f64,
    ) -> Result<(), DatabaseError> {
        self.db
            .db_set_node_attribute(node_id, attribute_name, attribute_value, confidence)
            .await
    }

    /// All attributes of a node, ordered by attribute name
    pub async fn attributes(&self, node_id: &str) -> Result<Vec<NodeAttribute>, DatabaseError> {
        let mut rows = self.db.db_get_node_attributes(node_id).await?;

        let mut attributes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let created_at: String = row.get(4).map_err(|e| Self::column_error("created_at", e))?;
            let updated_at: String = row.get(5).map_err(|e| Self::column_error("updated_at", e))?;
            attributes.push(NodeAttribute {
                node_id: row.get(0).map_err(|e| Self::column_error("node_id", e))?,
                attribute_name: row
                    .get(1)
                    .map_err(|e| Self::column_error("attribute_name", e))?,
                attribute_value: row
                    .get(2)
                    .map_err(|e| Self::column_error("attribute_value", e))?,
                confidence: row.get(3).map_err(|e| Self::column_error("confidence", e))?,
                created_at: Self::parse_timestamp(&created_at)?,
                updated_at: Self::parse_timestamp(&updated_at)?,
            });
        }

        Ok(attributes)
    }

    /// Assert a hierarchy relation, overwriting its confidence
    pub async fn upsert_hierarchy(
        &self,
        parent_id: &str,
        child_id: &str,
        hierarchy_type: &str,
        confidence: f64,
    ) -> Result<(), DatabaseError> {
        self.db
            .db_upsert_hierarchy(parent_id, child_id, hierarchy_type, confidence)
            .await
    }

    /// Hierarchy relations where the node is the parent
    pub async fn children(&self, parent_id: &str) -> Result<Vec<HierarchyEdge>, DatabaseError> {
        let rows = self.db.db_get_children(parent_id).await?;
        Self::collect_hierarchy_rows(rows).await
    }

    /// Hierarchy relations where the node is the child
    pub async fn parents(&self, child_id: &str) -> Result<Vec<HierarchyEdge>, DatabaseError> {
        let rows = self.db.db_get_parents(child_id).await?;
        Self::collect_hierarchy_rows(rows).await
    }

    async fn collect_hierarchy_rows(
        mut rows: libsql::Rows,
    ) -> Result<Vec<HierarchyEdge>, DatabaseError> {
        let mut relations = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let created_at: String = row.get(4).map_err(|e| Self::column_error("created_at", e))?;
            let updated_at: String = row.get(5).map_err(|e| Self::column_error("updated_at", e))?;
            relations.push(HierarchyEdge {
                parent_id: row.get(0).map_err(|e| Self::column_error("parent_id", e))?,
                child_id: row.get(1).map_err(|e| Self::column_error("child_id", e))?,
                hierarchy_type: row
                    .get(2)
                    .map_err(|e| Self::column_error("hierarchy_type", e))?,
                confidence: row.get(3).map_err(|e| Self::column_error("confidence", e))?,
                created_at: Self::parse_timestamp(&created_at)?,
                updated_at: Self::parse_timestamp(&updated_at)?,
            });
        }
        Ok(relations)
    }

    /// Row counts for all graph tables
    pub async fn status(&self) -> Result<Vec<TableStatus>, DatabaseError> {
        self.db.status().await
    }
}
