//! TreeStore Trait - Nested-Set Storage Abstraction
//!
//! This module defines the `TreeStore` trait consumed by the listing adapter.
//! A tree store persists `TreeNode`s with preorder bounds and owns every write to
//! `tree_id`, `lft`, `rght`, `level` and `parent_id`.
//!
//! # Implementations
//!
//! - [`MemoryTreeStore`](crate::db::MemoryTreeStore): process-local, used by tests
//!   and the demo server
//! - [`LibsqlTreeStore`](crate::db::LibsqlTreeStore): libsql/SQLite table with
//!   configurable column names
//!
//! # Examples
//!
//! ```rust,no_run
//! use outliner_core::db::{MemoryTreeStore, TreeStore};
//! use outliner_core::models::Position;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryTreeStore::new();
//!     let docs = store.insert_node("Docs", None).await?;
//!     let blog = store.insert_node("Blog", None).await?;
//!
//!     // Move "Blog" in front of "Docs"
//!     store.move_node(blog.id, docs.id, Position::Left).await?;
//!     Ok(())
//! }
//! ```

use crate::db::error::TreeStoreError;
use crate::models::{NodeId, Position, TreeNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Column a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeColumn {
    Id,
    Title,
    TreeId,
    Left,
    Right,
    Level,
}

/// One ordering term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub column: TreeColumn,
    pub descending: bool,
}

impl OrderTerm {
    pub fn asc(column: TreeColumn) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    pub fn desc(column: TreeColumn) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Row filter for listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    /// Only nodes at this level
    pub level: Option<i32>,
    /// Only direct children of this node
    pub parent_id: Option<NodeId>,
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
}

impl NodeFilter {
    /// True if `node` passes every set criterion
    pub fn matches(&self, node: &TreeNode) -> bool {
        if let Some(level) = self.level {
            if node.level != level {
                return false;
            }
        }
        if let Some(parent_id) = self.parent_id {
            if node.parent_id != Some(parent_id) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !node.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// A listing query: filter, ordering and an optional window
///
/// An empty `ordering` means "store default" (primary key order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub filter: NodeFilter,
    pub ordering: Vec<OrderTerm>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ListingQuery {
    pub fn new(filter: NodeFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Replace the ordering
    pub fn order_by(mut self, ordering: Vec<OrderTerm>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Restrict the result window
    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Table and column names of the nested-set encoding
///
/// Stores that persist to SQL interpolate these into statements, so every name
/// must be a plain identifier; [`TreeFieldNames::validate`] enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeFieldNames {
    pub table: String,
    pub tree_id_field: String,
    pub left_field: String,
    pub right_field: String,
    pub level_field: String,
    pub parent_field: String,
}

impl Default for TreeFieldNames {
    fn default() -> Self {
        Self {
            table: "nodes".to_string(),
            tree_id_field: "tree_id".to_string(),
            left_field: "lft".to_string(),
            right_field: "rght".to_string(),
            level_field: "level".to_string(),
            parent_field: "parent_id".to_string(),
        }
    }
}

impl TreeFieldNames {
    /// The ordering that yields a preorder traversal of every tree, tree by tree
    pub fn tree_order() -> Vec<OrderTerm> {
        vec![
            OrderTerm::asc(TreeColumn::TreeId),
            OrderTerm::asc(TreeColumn::Left),
        ]
    }

    /// Column name for `column`
    pub fn column(&self, column: TreeColumn) -> &str {
        match column {
            TreeColumn::Id => "id",
            TreeColumn::Title => "title",
            TreeColumn::TreeId => &self.tree_id_field,
            TreeColumn::Left => &self.left_field,
            TreeColumn::Right => &self.right_field,
            TreeColumn::Level => &self.level_field,
        }
    }

    /// Reject names that are not `[A-Za-z_][A-Za-z0-9_]*`
    pub fn validate(&self) -> Result<(), TreeStoreError> {
        let names = [
            ("table", &self.table),
            ("tree_id_field", &self.tree_id_field),
            ("left_field", &self.left_field),
            ("right_field", &self.right_field),
            ("level_field", &self.level_field),
            ("parent_field", &self.parent_field),
        ];
        for (field, name) in names {
            if !is_identifier(name) {
                return Err(TreeStoreError::InvalidFieldName {
                    field: field.to_string(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Persistence of nested-set trees
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the HTTP layer shares one store across
/// requests. `move_node` must be atomic: concurrent moves are serialized and a
/// rejected move leaves every row untouched.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Get node by ID (`Ok(None)` if it does not exist)
    async fn get_node(&self, id: NodeId) -> Result<Option<TreeNode>, TreeStoreError>;

    /// Ancestors of a node
    ///
    /// `ascending = true` returns the nearest ancestor first (parent, grandparent,
    /// ..., root); otherwise root first. `include_self` appends (or prepends) the
    /// node itself.
    async fn get_ancestors(
        &self,
        id: NodeId,
        ascending: bool,
        include_self: bool,
    ) -> Result<Vec<TreeNode>, TreeStoreError>;

    /// The root of the first tree, if any tree exists
    async fn first_root(&self) -> Result<Option<TreeNode>, TreeStoreError>;

    /// Run a listing query
    async fn query_nodes(&self, query: &ListingQuery) -> Result<Vec<TreeNode>, TreeStoreError>;

    /// Number of rows matching `filter`
    async fn count_nodes(&self, filter: &NodeFilter) -> Result<usize, TreeStoreError>;

    /// Append a new node as the last child of `parent_id`, or as a new last tree
    async fn insert_node(
        &self,
        title: &str,
        parent_id: Option<NodeId>,
    ) -> Result<TreeNode, TreeStoreError>;

    /// Move `node_id` (with its subtree) relative to `target_id`
    ///
    /// # Errors
    ///
    /// - `InvalidRelocation` if the move would create a cycle or either id is stale
    /// - `Conflict` if a concurrent writer prevented the commit
    async fn move_node(
        &self,
        node_id: NodeId,
        target_id: NodeId,
        position: Position,
    ) -> Result<TreeNode, TreeStoreError>;
}
