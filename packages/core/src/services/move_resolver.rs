//! Move Resolver
//!
//! Turns a drag-and-drop gesture into one instruction for the tree store's move
//! primitive. The UI reports where the node was dropped (`target`), which parent
//! it should end up under, and whether it was dropped *before* the target. The
//! store only understands "first child of", "left of" and "right of" a target.
//!
//! # Algorithm
//!
//! 1. The desired level is the desired parent's level + 1, or the root level when
//!    the node should become a root.
//! 2. A target deeper than the desired level is replaced by its ancestor at the
//!    desired level (the drop point sits inside a sibling's subtree).
//! 3. If the target is the desired parent the node becomes its first child; a
//!    `"before"` hint puts it left of the target; anything else puts it right of
//!    the target.
//!
//! The resolver does not check for cycles. The store rejects a node moved into its
//! own subtree.

use crate::models::{Position, PositionHint, RelocationRequest, TreeNode};
use crate::services::error::ResolveError;

/// Already-fetched nodes describing one gesture
#[derive(Debug, Clone, Copy)]
pub struct MoveGesture<'a> {
    /// The dragged node
    pub node: &'a TreeNode,
    /// Where it was dropped
    pub target: &'a TreeNode,
    /// Parent it should end up under (`None` for root level)
    pub desired_parent: Option<&'a TreeNode>,
    pub hint: PositionHint,
}

/// Stateless gesture resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveResolver {
    root_level: i32,
}

impl MoveResolver {
    pub fn new(root_level: i32) -> Self {
        Self { root_level }
    }

    pub fn root_level(&self) -> i32 {
        self.root_level
    }

    /// Level the node will have after the move
    pub fn desired_level(&self, desired_parent: Option<&TreeNode>) -> i32 {
        desired_parent.map_or(self.root_level, |parent| parent.level + 1)
    }

    /// True if the target must be replaced by one of its ancestors
    ///
    /// Callers use this to fetch the target's ancestors only when `resolve` needs
    /// them.
    pub fn needs_normalization(&self, gesture: &MoveGesture<'_>) -> bool {
        gesture.target.level > self.desired_level(gesture.desired_parent)
    }

    /// Compute the relocation request for `gesture`
    ///
    /// `target_ancestors` lists the target's ancestors nearest first; it is only
    /// read when [`needs_normalization`](Self::needs_normalization) is true.
    pub fn resolve(
        &self,
        gesture: &MoveGesture<'_>,
        target_ancestors: &[TreeNode],
    ) -> Result<RelocationRequest, ResolveError> {
        let desired_level = self.desired_level(gesture.desired_parent);

        let target = if gesture.target.level > desired_level {
            target_ancestors
                .iter()
                .find(|ancestor| ancestor.level == desired_level)
                .ok_or(ResolveError::MissingAncestor {
                    target_id: gesture.target.id,
                    level: desired_level,
                })?
        } else {
            gesture.target
        };

        let position = if gesture.desired_parent.is_some_and(|parent| parent.id == target.id) {
            Position::FirstChild
        } else if gesture.hint == PositionHint::Before {
            Position::Left
        } else {
            Position::Right
        };

        tracing::debug!(
            "Resolved move of node {}: {} node {} (dropped on {}, desired level {})",
            gesture.node.id,
            position,
            target.id,
            gesture.target.id,
            desired_level
        );

        Ok(RelocationRequest {
            node_id: gesture.node.id,
            target_id: target.id,
            position,
        })
    }
}
