//! Database Layer
//!
//! This module handles storage of nested-set trees:
//!
//! - `TreeStore` trait consumed by the listing adapter
//! - `Forest`, the shared relocation/renumbering logic
//! - `MemoryTreeStore` for tests and the demo server
//! - `LibsqlTreeStore` for persistent storage in an embedded libsql database
//!
//! # Architecture
//!
//! The move resolver never touches bounds. It produces a `(node, target, position)`
//! request and the store's `move_node` applies it atomically, rejecting moves that
//! would put a node inside its own subtree.

mod error;
mod libsql_store;
mod memory_store;
pub mod nested_set;
mod tree_store;

pub use error::{DatabaseError, TreeStoreError};
pub use libsql_store::LibsqlTreeStore;
pub use memory_store::MemoryTreeStore;
pub use nested_set::{check_preorder, Forest, Relocation};
pub use tree_store::{
    ListingQuery, NodeFilter, OrderTerm, TreeColumn, TreeFieldNames, TreeStore,
};
