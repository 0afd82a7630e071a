//! Service Layer Error Types
//!
//! Errors raised while resolving moves and serving listings. Relocation
//! rejections by the store are not errors at this layer: the adapter turns them
//! into `AjaxResponse::Fail` so the listing stays usable.

use crate::db::TreeStoreError;
use crate::models::{FormError, NodeId};
use thiserror::Error;

/// Move resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The drop target has no ancestor at the level the node should land on
    #[error("Target node {target_id} has no ancestor at level {level}")]
    MissingAncestor { target_id: NodeId, level: i32 },
}

/// Listing adapter errors
#[derive(Error, Debug)]
pub enum ListingError {
    /// `__cmd` was something other than `move_node`
    #[error("AJAX request not understood.")]
    UnrecognizedCommand { command: String },

    /// A request field was missing or malformed
    #[error("Invalid request: {0}")]
    Form(#[from] FormError),

    /// An id from the request does not resolve to a node
    #[error("Node not found for '{field}': {id}")]
    NodeNotFound { field: String, id: NodeId },

    /// Move resolution failed
    #[error("Cannot resolve move: {0}")]
    Resolve(#[from] ResolveError),

    /// Tree store failure
    #[error(transparent)]
    Store(#[from] TreeStoreError),
}

impl ListingError {
    /// Create an unrecognized command error
    pub fn unrecognized_command(command: impl Into<String>) -> Self {
        Self::UnrecognizedCommand {
            command: command.into(),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(field: impl Into<String>, id: NodeId) -> Self {
        Self::NodeNotFound {
            field: field.into(),
            id,
        }
    }
}
