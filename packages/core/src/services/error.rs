//! Service Layer Error Types
//!
//! Error types for the graph services, split along the taxonomy the
//! pipeline relies on: data errors (malformed item, bad timestamp) are
//! recoverable per item/pair, storage errors abort the enclosing
//! operation.

use crate::db::DatabaseError;
use thiserror::Error;

/// Graph service operation errors
#[derive(Error, Debug)]
pub enum GraphServiceError {
    /// Database operation failed
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Item could not be used (undecodable JSON, unusable shape)
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Timestamp facet failed to parse as ISO-8601
    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphServiceError {
    /// Create an invalid item error
    pub fn invalid_item(msg: impl Into<String>) -> Self {
        Self::InvalidItem(msg.into())
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp(value: impl Into<String>, source: chrono::ParseError) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            source,
        }
    }

    /// Whether this error came from the input data (malformed item,
    /// bad timestamp) rather than from storage.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidItem(_) | Self::InvalidTimestamp { .. } | Self::Serialization(_)
        )
    }
}
