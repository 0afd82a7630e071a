//! Tree Node Data Structures
//!
//! This module defines the `TreeNode` struct, a record stored with a preorder
//! ("nested set") bound encoding.
//!
//! # Encoding
//!
//! - **tree_id**: groups every node that belongs to the same root tree
//! - **lft / rght**: preorder traversal bounds; a descendant's bounds lie strictly
//!   inside its ancestors' bounds
//! - **level**: depth below the root, offset by the store's root level
//!
//! Only a [`TreeStore`](crate::db::TreeStore) may change the bound and level fields.
//!
//! # Examples
//!
//! ```rust
//! use outliner_core::models::TreeNode;
//!
//! let root = TreeNode::new(1, "Site", None, 1, 1, 4, 0);
//! let child = TreeNode::new(2, "About", Some(1), 1, 2, 3, 1);
//!
//! assert!(child.is_descendant_of(&root));
//! assert_eq!(root.descendant_count(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary key type used for tree nodes
pub type NodeId = i64;

/// A record positioned in a nested-set tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Unique identifier
    pub id: NodeId,

    /// Display text (used for listings, choice labels and title search)
    pub title: String,

    /// Parent reference (`None` for roots)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,

    /// Identifier of the root tree this node belongs to
    pub tree_id: i64,

    /// Left preorder bound
    pub lft: i64,

    /// Right preorder bound
    pub rght: i64,

    /// Depth (root level + number of ancestors)
    pub level: i32,

    /// Last time the store wrote this node
    pub modified_at: DateTime<Utc>,
}

impl TreeNode {
    /// Build a node with explicit bounds
    ///
    /// Stores use this when hydrating rows; callers that want a new node should go
    /// through [`TreeStore::insert_node`](crate::db::TreeStore::insert_node) instead.
    pub fn new(
        id: NodeId,
        title: impl Into<String>,
        parent_id: Option<NodeId>,
        tree_id: i64,
        lft: i64,
        rght: i64,
        level: i32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            parent_id,
            tree_id,
            lft,
            rght,
            level,
            modified_at: Utc::now(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True if `self` is strictly inside `other`'s subtree
    pub fn is_descendant_of(&self, other: &TreeNode) -> bool {
        self.tree_id == other.tree_id && self.lft > other.lft && self.rght < other.rght
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> i64 {
        (self.rght - self.lft - 1) / 2
    }

    /// True if the two records carry the same bounds, level, tree and parent
    pub fn same_position(&self, other: &TreeNode) -> bool {
        self.parent_id == other.parent_id
            && self.tree_id == other.tree_id
            && self.lft == other.lft
            && self.rght == other.rght
            && self.level == other.level
    }
}
