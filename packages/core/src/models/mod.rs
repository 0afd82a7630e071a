//! Data Models
//!
//! This module contains the data structures shared by the store, the move
//! resolver and the listing adapter:
//!
//! - `TreeNode` - A record positioned with preorder (nested set) bounds
//! - Relocation types (`Position`, `ParentChoice`, `MoveNodeForm`, ...) describing
//!   a drag-and-drop gesture and the move it turns into

mod relocation;
mod tree_node;

pub use relocation::{
    FormError, MoveNodeForm, ParentChoice, Position, PositionHint, RelocationRequest,
    PARENT_CURRENT, PARENT_NONE, POSITION_BEFORE,
};
pub(crate) use relocation::parse_id;
pub use tree_node::{NodeId, TreeNode};
