//! Outliner Core
//!
//! Drag-and-drop reordering for hierarchical records stored with a preorder
//! ("nested set") bound encoding.
//!
//! # Architecture
//!
//! - **Move resolution**: a drag-and-drop gesture (dragged node, drop target,
//!   desired parent, position hint) becomes one `(target, first-child | left |
//!   right)` instruction for the store
//! - **Tree stores**: own all bound/level maintenance and apply moves atomically
//! - **Listing adapter**: tree-ordered changelists, one-level browsing with
//!   breadcrumbs, and the `move_node` AJAX command
//!
//! # Modules
//!
//! - [`models`] - Tree nodes and relocation types
//! - [`db`] - `TreeStore` trait, in-memory and libsql stores
//! - [`services`] - Move resolver, listing adapter, tree choice labels
//! - [`config`] - Adapter and server configuration
//! - [`http`] - axum router for the changelist endpoint

pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{AdapterConfig, ListingMode, ServerConfig};
pub use db::{LibsqlTreeStore, MemoryTreeStore, TreeStore, TreeStoreError};
pub use models::*;
pub use services::*;
