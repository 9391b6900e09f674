//! Data Models
//!
//! Core data structures for the knowledge graph:
//!
//! - [`ItemFacets`] - the comparable facets extracted from an item
//! - [`Edge`], [`Neighbor`], [`Relation`] - weighted typed relations
//! - [`NodeAttribute`], [`HierarchyEdge`] - auxiliary node records
//! - [`relationship`] - well-known relationship type constants

pub mod edge;
pub mod item;

pub use edge::{relationship, Edge, HierarchyEdge, Neighbor, NodeAttribute, Relation};
pub use item::ItemFacets;
