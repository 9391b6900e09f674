//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Connection lifecycle and schema initialization
//! - Additive schema evolution for legacy databases
//! - Atomic upsert operations for edges, attributes, and hierarchies
//!
//! # Architecture
//!
//! [`DatabaseService`] owns the connection and the raw `db_*` SQL
//! operations; [`GraphStore`] wraps it and speaks in the crate's
//! models. The handle is constructed once by the caller and passed to
//! every component; there is no process-wide connection singleton.

mod database;
mod error;
mod graph_store;

pub use database::{DatabaseService, EdgeSpec, TableStatus};
pub use error::DatabaseError;
pub use graph_store::GraphStore;
