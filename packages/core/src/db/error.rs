//! Database Error Types
//!
//! This module defines error types for the storage layer: low-level libsql
//! failures (`DatabaseError`) and tree-level failures (`TreeStoreError`) that the
//! listing adapter needs to classify.

use crate::models::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, initialization and SQL execution failures of the libsql
/// backend. Tree-structure violations are reported through `TreeStoreError`.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A stored row could not be converted into a node
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }
}

/// Tree store errors
///
/// `InvalidRelocation` and `Conflict` are relocation failures: the move was
/// rejected as a whole and nothing changed. Callers report them to the user
/// instead of treating them as server faults.
#[derive(Error, Debug)]
pub enum TreeStoreError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// The requested move would break the tree (cycle, stale id, ...)
    #[error("{0}")]
    InvalidRelocation(String),

    /// A concurrent writer prevented the move from committing
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// A configured column or table name is not a plain SQL identifier
    #[error("Invalid field name for {field}: {name:?}")]
    InvalidFieldName { field: String, name: String },

    /// Database operation failed
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl TreeStoreError {
    /// Create a node not found error
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create an invalid relocation error
    pub fn invalid_relocation(msg: impl Into<String>) -> Self {
        Self::InvalidRelocation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// True for errors that mean "the move was rejected, the tree is unchanged"
    pub fn is_relocation_failure(&self) -> bool {
        matches!(self, Self::InvalidRelocation(_) | Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocation_failure_classification() {
        assert!(TreeStoreError::invalid_relocation("cycle").is_relocation_failure());
        assert!(TreeStoreError::conflict("database is locked").is_relocation_failure());
        assert!(!TreeStoreError::node_not_found(3).is_relocation_failure());
        assert!(
            !TreeStoreError::Database(DatabaseError::sql_execution("boom"))
                .is_relocation_failure()
        );
    }

    #[test]
    fn test_invalid_relocation_message_is_bare() {
        let err = TreeStoreError::invalid_relocation("A node may not be made a child of itself.");
        assert_eq!(err.to_string(), "A node may not be made a child of itself.");
    }
}
