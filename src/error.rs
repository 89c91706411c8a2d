//! Error types
//!
//! `StorageError` covers node store backends; `ApiError` is the surface returned by
//! hierarchy resolution, planning, packing and the attachment service.

use crate::types::NodeId;
use thiserror::Error;

/// Errors raised by a node store backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Corrupt hierarchy at node {id}: {reason}")]
    CorruptHierarchy { id: NodeId, reason: String },

    #[error("Invalid stored record {id}: {reason}")]
    InvalidRecord { id: NodeId, reason: String },
}

/// Errors surfaced to callers of the hierarchy and archive operations
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Corrupt hierarchy at node {id}: {reason}")]
    CorruptHierarchy { id: NodeId, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive entry {zip_path} is produced by both {first} and {second}")]
    DuplicateEntryConflict {
        zip_path: String,
        first: String,
        second: String,
    },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Forbidden to pack more than {limit} files (requested {requested})")]
    PackLimitExceeded { limit: usize, requested: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl ApiError {
    /// Wrap an I/O failure together with the path it concerns.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ApiError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(id: impl Into<NodeId>, reason: impl Into<String>) -> Self {
        ApiError::CorruptHierarchy {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NodeNotFound(id) => ApiError::NotFound(id),
            StorageError::CorruptHierarchy { id, reason } => {
                ApiError::CorruptHierarchy { id, reason }
            }
            other => ApiError::Storage(other),
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
