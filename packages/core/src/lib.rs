//! GraphKB Core Logic Layer
//!
//! This crate provides the knowledge-graph store, similarity engine,
//! and migration pipeline for the GraphKB system.
//!
//! # Architecture
//!
//! - **Content-addressed nodes**: an item's id is the SHA-256 of its
//!   canonical JSON, so identical content deduplicates by construction
//! - **Edges as the graph**: nodes exist implicitly; the tables store
//!   typed, weighted edges plus node attributes and hierarchy links
//! - **libsql**: embedded SQLite-compatible database, WAL mode
//! - **Additive evolution**: legacy databases are upgraded in place by
//!   adding columns and indexes, never dropping or rewriting
//!
//! # Modules
//!
//! - [`models`] - Data structures (Edge, Relation, ItemFacets, etc.)
//! - [`services`] - Identity hashing, similarity analysis, ingestion,
//!   and batch migration
//! - [`db`] - Database layer with libsql integration

pub mod models;
pub mod services;
pub mod db;

// Re-export commonly used types
pub use models::*;
pub use services::*;
