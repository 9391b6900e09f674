//! Database Connection Management
//!
//! This module provides the core database connection, schema
//! initialization, and raw SQL operations for the knowledge graph,
//! using libsql as the embedded storage engine.
//!
//! # Architecture
//!
//! - **Explicit handle**: `DatabaseService` is constructed once by the
//!   caller and passed to every component; there is no process-wide
//!   connection state.
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Atomic upserts**: every edge/attribute/hierarchy write is a
//!   single `INSERT ... ON CONFLICT` statement, so concurrent writers
//!   can never produce duplicate rows nor lose the later write.
//! - **Additive evolution**: `evolve_schema` upgrades a pre-existing
//!   edges table by adding the optional columns and indexes, one
//!   statement at a time, and is safe to re-run.
//!
//! # Database Connection Patterns
//!
//! Always use `connect_with_timeout()` in async functions. The busy
//! timeout lets concurrent operations wait and retry instead of
//! failing immediately with `SQLITE_BUSY` when the Tokio runtime moves
//! futures between threads.

use crate::db::error::DatabaseError;
use chrono::{DateTime, Utc};
use libsql::{Builder, Database};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Optional columns added to the `edges` table after its first
/// shipped shape. `evolve_schema` backfills these on legacy databases.
const EDGE_OPTIONAL_COLUMNS: &[(&str, &str)] = &[
    ("confidence", "REAL NOT NULL DEFAULT 1.0"),
    ("bidirectional", "INTEGER DEFAULT 0"),
    ("start_time", "DATETIME"),
    ("end_time", "DATETIME"),
    ("metadata", "JSON"),
];

/// Supporting indexes, all created with `IF NOT EXISTS` so both fresh
/// initialization and evolution can run them unconditionally.
const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_edges_source_id ON edges(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_target_id ON edges(target_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_relationship_type ON edges(relationship_type)",
    "CREATE INDEX IF NOT EXISTS idx_edges_start_time ON edges(start_time)",
    "CREATE INDEX IF NOT EXISTS idx_edges_end_time ON edges(end_time)",
    "CREATE INDEX IF NOT EXISTS idx_node_attributes_node_id ON node_attributes(node_id)",
    "CREATE INDEX IF NOT EXISTS idx_hierarchies_parent_id ON hierarchies(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_hierarchies_child_id ON hierarchies(child_id)",
];

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use graphkb_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/graphkb.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

/// Full parameters for an edge upsert (avoids too-many-arguments lint)
pub struct EdgeSpec<'a> {
    pub source_id: &'a str,
    pub target_id: &'a str,
    pub relationship_type: &'a str,
    pub strength: f64,
    pub confidence: f64,
    pub bidirectional: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub metadata: Option<&'a Value>,
}

impl<'a> EdgeSpec<'a> {
    /// An edge with default qualifiers: confidence 1.0, directed, no
    /// validity window, no metadata.
    pub fn new(
        source_id: &'a str,
        target_id: &'a str,
        relationship_type: &'a str,
        strength: f64,
    ) -> Self {
        Self {
            source_id,
            target_id,
            relationship_type,
            strength,
            confidence: 1.0,
            bidirectional: false,
            start_time: None,
            end_time: None,
            metadata: None,
        }
    }
}

/// Row-count report for one table, returned by
/// [`DatabaseService::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub table: String,
    pub rows: u64,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Run additive schema evolution for legacy databases
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be
    /// created, the connection fails, or schema initialization fails.
    /// Individual evolution statements that fail are logged and
    /// skipped, not fatal.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        // Only checkpoint the WAL for brand-new database files
        let is_new_database = !db_path.exists();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;
        service.evolve_schema().await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead
    /// of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// Only use this in synchronous, single-threaded contexts. In
    /// async functions use `connect_with_timeout()` instead.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    ///
    /// The safe default for async callers: a 5-second busy timeout so
    /// concurrent operations wait and retry instead of failing when
    /// the database is locked.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }

    /// Initialize database schema and configuration
    ///
    /// Creates the three graph tables, their indexes, and the
    /// `updated_at` refresh triggers using `IF NOT EXISTS` throughout,
    /// so initialization is idempotent.
    ///
    /// # Schema
    ///
    /// - `edges`: weighted typed relations, unique on
    ///   `(source_id, target_id, relationship_type)`
    /// - `node_attributes`: `(node_id, attribute_name)` → value
    /// - `hierarchies`: `(parent_id, child_id, hierarchy_type)` → confidence
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // WAL mode for better concurrency
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                relationship_type TEXT NOT NULL,
                strength REAL NOT NULL,
                confidence REAL NOT NULL DEFAULT 1.0,
                bidirectional INTEGER DEFAULT 0,
                start_time DATETIME,
                end_time DATETIME,
                metadata JSON,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(source_id, target_id, relationship_type)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create edges table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS node_attributes (
                node_id TEXT NOT NULL,
                attribute_name TEXT NOT NULL,
                attribute_value TEXT NOT NULL,
                confidence REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (node_id, attribute_name)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create node_attributes table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS hierarchies (
                parent_id TEXT NOT NULL,
                child_id TEXT NOT NULL,
                hierarchy_type TEXT NOT NULL,
                confidence REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (parent_id, child_id, hierarchy_type)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create hierarchies table: {}", e))
        })?;

        self.create_timestamp_triggers(&conn).await?;

        // Flush schema to disk for newly created databases so rapid
        // open/close sequences in tests never observe missing tables.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create `AFTER UPDATE` triggers that refresh `updated_at`
    ///
    /// SQLite has no `ON UPDATE CURRENT_TIMESTAMP` column clause, so
    /// each table gets a trigger instead. Recursive triggers are off
    /// by default, so the trigger's own UPDATE does not re-fire it.
    async fn create_timestamp_triggers(
        &self,
        conn: &libsql::Connection,
    ) -> Result<(), DatabaseError> {
        let triggers = [
            "CREATE TRIGGER IF NOT EXISTS update_edges_timestamp
             AFTER UPDATE ON edges
             FOR EACH ROW
             BEGIN
                 UPDATE edges SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
             END",
            "CREATE TRIGGER IF NOT EXISTS update_node_attributes_timestamp
             AFTER UPDATE ON node_attributes
             FOR EACH ROW
             BEGIN
                 UPDATE node_attributes SET updated_at = CURRENT_TIMESTAMP
                 WHERE node_id = NEW.node_id AND attribute_name = NEW.attribute_name;
             END",
            "CREATE TRIGGER IF NOT EXISTS update_hierarchies_timestamp
             AFTER UPDATE ON hierarchies
             FOR EACH ROW
             BEGIN
                 UPDATE hierarchies SET updated_at = CURRENT_TIMESTAMP
                 WHERE parent_id = NEW.parent_id AND child_id = NEW.child_id
                   AND hierarchy_type = NEW.hierarchy_type;
             END",
        ];

        for trigger in triggers {
            conn.execute(trigger, ()).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to create trigger: {}", e))
            })?;
        }

        Ok(())
    }

    /// List the column names of a table via `pragma_table_info`
    async fn table_columns(
        &self,
        conn: &libsql::Connection,
        table: &str,
    ) -> Result<HashSet<String>, DatabaseError> {
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?)")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare table_info query: {}", e))
            })?;

        let mut rows = stmt.query([table]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to query table_info: {}", e))
        })?;

        let mut columns = HashSet::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let name: String = row
                .get(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            columns.insert(name);
        }

        Ok(columns)
    }

    /// Apply additive schema evolution
    ///
    /// Upgrades an edges table created before the optional columns
    /// existed (`confidence`, `bidirectional`, `start_time`,
    /// `end_time`, `metadata`) and creates any missing indexes.
    ///
    /// Evolution is applied statement-by-statement: a failing
    /// statement is logged and skipped so the remaining steps still
    /// run, and a column or index that already exists is informational,
    /// not an error. Re-running on an up-to-date database is a no-op.
    pub async fn evolve_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let existing = self.table_columns(&conn, "edges").await?;

        for (column, definition) in EDGE_OPTIONAL_COLUMNS {
            if existing.contains(*column) {
                debug!(column, "edges column already present");
                continue;
            }

            let stmt = format!("ALTER TABLE edges ADD COLUMN {} {}", column, definition);
            match conn.execute(&stmt, ()).await {
                Ok(_) => info!(column, "added column to edges table"),
                Err(e) if e.to_string().contains("duplicate column") => {
                    info!(column, "edges column already exists")
                }
                Err(e) => {
                    warn!(column, error = %e, "skipping failed schema evolution statement")
                }
            }
        }

        for stmt in INDEX_STATEMENTS {
            if let Err(e) = conn.execute(stmt, ()).await {
                warn!(statement = stmt, error = %e, "skipping failed index statement");
            }
        }

        Ok(())
    }

    //
    // GRAPH STORE OPERATIONS
    // Raw SQL extracted here so GraphStore stays a thin row-to-model
    // conversion layer.
    //

    /// Upsert an edge row
    ///
    /// A single atomic statement: inserts a new row, or on unique-key
    /// conflict on `(source_id, target_id, relationship_type)`
    /// replaces `strength` only (last-writer-wins). The other columns
    /// keep their first-written values; `updated_at` refreshes via
    /// trigger.
    pub async fn db_upsert_edge(&self, spec: &EdgeSpec<'_>) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let metadata = spec.metadata.map(|m| m.to_string());
        let start_time = spec.start_time.map(|t| t.to_rfc3339());
        let end_time = spec.end_time.map(|t| t.to_rfc3339());

        conn.execute(
            "INSERT INTO edges (source_id, target_id, relationship_type, strength,
                                confidence, bidirectional, start_time, end_time, metadata)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(source_id, target_id, relationship_type)
             DO UPDATE SET strength = excluded.strength",
            (
                spec.source_id,
                spec.target_id,
                spec.relationship_type,
                spec.strength,
                spec.confidence,
                spec.bidirectional as i64,
                start_time,
                end_time,
                metadata,
            ),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to upsert edge: {}", e)))?;

        Ok(())
    }

    /// Fetch one edge row by its unique key
    pub async fn db_get_edge(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, source_id, target_id, relationship_type, strength, confidence,
                        bidirectional, start_time, end_time, metadata, created_at, updated_at
                 FROM edges
                 WHERE source_id = ? AND target_id = ? AND relationship_type = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_edge query: {}", e))
            })?;

        let mut rows = stmt
            .query((source_id, target_id, relationship_type))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute get_edge query: {}", e))
            })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Count edge rows
    pub async fn db_edge_count(&self) -> Result<u64, DatabaseError> {
        self.db_table_count("edges").await
    }

    /// Count rows of one of the graph tables
    ///
    /// The table name is matched against the known schema rather than
    /// interpolated blindly.
    pub async fn db_table_count(&self, table: &str) -> Result<u64, DatabaseError> {
        if !matches!(table, "edges" | "node_attributes" | "hierarchies") {
            return Err(DatabaseError::sql_execution(format!(
                "Unknown table: {}",
                table
            )));
        }

        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!("SELECT COUNT(*) FROM {}", table))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare count query: {}", e))
            })?;

        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute count query: {}", e))
        })?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .ok_or_else(|| DatabaseError::sql_execution("COUNT(*) returned no row".to_string()))?;

        let count: i64 = row
            .get(0)
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;

        Ok(count as u64)
    }

    /// Query edges touching a node, direction erased
    ///
    /// Returns the union of edges where the node is source or target;
    /// the first column is always "the other end".
    pub async fn db_neighbors(
        &self,
        node_id: &str,
        relationship_type: Option<&str>,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows = if let Some(rel_type) = relationship_type {
            let mut stmt = conn
                .prepare(
                    "SELECT target_id, relationship_type, strength
                     FROM edges
                     WHERE source_id = ? AND relationship_type = ?
                     UNION
                     SELECT source_id, relationship_type, strength
                     FROM edges
                     WHERE target_id = ? AND relationship_type = ?",
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to prepare neighbors query: {}",
                        e
                    ))
                })?;

            stmt.query((node_id, rel_type, node_id, rel_type))
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to execute neighbors query: {}",
                        e
                    ))
                })?
        } else {
            let mut stmt = conn
                .prepare(
                    "SELECT target_id, relationship_type, strength
                     FROM edges
                     WHERE source_id = ?
                     UNION
                     SELECT source_id, relationship_type, strength
                     FROM edges
                     WHERE target_id = ?",
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to prepare neighbors query: {}",
                        e
                    ))
                })?;

            stmt.query((node_id, node_id)).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute neighbors query: {}", e))
            })?
        };

        Ok(rows)
    }

    /// Upsert a node attribute
    ///
    /// Primary key is `(node_id, attribute_name)`: re-asserting an
    /// attribute overwrites its value and confidence atomically.
    pub async fn db_set_node_attribute(
        &self,
        node_id: &str,
        attribute_name: &str,
        attribute_value: &str,
        confidence: f64,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO node_attributes (node_id, attribute_name, attribute_value, confidence)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(node_id, attribute_name)
             DO UPDATE SET attribute_value = excluded.attribute_value,
                           confidence = excluded.confidence",
            (node_id, attribute_name, attribute_value, confidence),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to set node attribute: {}", e))
        })?;

        Ok(())
    }

    /// Fetch all attributes of a node
    pub async fn db_get_node_attributes(
        &self,
        node_id: &str,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT node_id, attribute_name, attribute_value, confidence,
                        created_at, updated_at
                 FROM node_attributes
                 WHERE node_id = ?
                 ORDER BY attribute_name",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare attributes query: {}", e))
            })?;

        stmt.query([node_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute attributes query: {}", e))
        })
    }

    /// Upsert a hierarchy relation
    pub async fn db_upsert_hierarchy(
        &self,
        parent_id: &str,
        child_id: &str,
        hierarchy_type: &str,
        confidence: f64,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO hierarchies (parent_id, child_id, hierarchy_type, confidence)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(parent_id, child_id, hierarchy_type)
             DO UPDATE SET confidence = excluded.confidence",
            (parent_id, child_id, hierarchy_type, confidence),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to upsert hierarchy: {}", e)))?;

        Ok(())
    }

    /// Fetch hierarchy rows where the node is the parent
    pub async fn db_get_children(&self, parent_id: &str) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT parent_id, child_id, hierarchy_type, confidence, created_at, updated_at
                 FROM hierarchies
                 WHERE parent_id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare children query: {}", e))
            })?;

        stmt.query([parent_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute children query: {}", e))
        })
    }

    /// Fetch hierarchy rows where the node is the child
    pub async fn db_get_parents(&self, child_id: &str) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT parent_id, child_id, hierarchy_type, confidence, created_at, updated_at
                 FROM hierarchies
                 WHERE child_id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare parents query: {}", e))
            })?;

        stmt.query([child_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute parents query: {}", e))
        })
    }

    /// Row counts for all graph tables
    pub async fn status(&self) -> Result<Vec<TableStatus>, DatabaseError> {
        let mut report = Vec::new();
        for table in ["edges", "node_attributes", "hierarchies"] {
            let rows = self.db_table_count(table).await?;
            report.push(TableStatus {
                table: table.to_string(),
                rows,
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_schema_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kb.db");

        let _first = DatabaseService::new(path.clone()).await.unwrap();
        let second = DatabaseService::new(path).await.unwrap();

        assert_eq!(second.db_edge_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_evolve_schema_upgrades_legacy_edges_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("legacy.db");

        // Seed a database with the original edges shape, predating the
        // optional columns.
        {
            let db = Builder::new_local(&path).build().await.unwrap();
            let conn = db.connect().unwrap();
            conn.execute(
                "CREATE TABLE edges (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source_id TEXT NOT NULL,
                    target_id TEXT NOT NULL,
                    relationship_type TEXT NOT NULL,
                    strength REAL NOT NULL,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    UNIQUE(source_id, target_id, relationship_type)
                )",
                (),
            )
            .await
            .unwrap();
            conn.execute(
                "INSERT INTO edges (source_id, target_id, relationship_type, strength)
                 VALUES ('a', 'b', 'RELATED_TO', 1.0)",
                (),
            )
            .await
            .unwrap();
        }

        let service = DatabaseService::new(path).await.unwrap();

        let conn = service.connect_with_timeout().await.unwrap();
        let columns = service.table_columns(&conn, "edges").await.unwrap();
        for column in ["confidence", "bidirectional", "start_time", "end_time", "metadata"] {
            assert!(columns.contains(column), "missing column {}", column);
        }

        // Pre-existing data survives and reads back with the column default.
        let row = service
            .db_get_edge("a", "b", "RELATED_TO")
            .await
            .unwrap()
            .expect("legacy edge should survive evolution");
        let confidence: f64 = row.get(5).unwrap();
        assert_eq!(confidence, 1.0);

        // Re-running evolution is a no-op.
        service.evolve_schema().await.unwrap();
        assert_eq!(service.db_edge_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_table_count_rejects_unknown_table() {
        let temp = TempDir::new().unwrap();
        let service = DatabaseService::new(temp.path().join("kb.db")).await.unwrap();

        assert!(service.db_table_count("sqlite_master").await.is_err());
    }
}
