//! Nested-set bookkeeping shared by the tree stores
//!
//! `Forest` holds a whole set of trees as ordered child lists, performs a
//! structural move and then renumbers `tree_id`, `lft`, `rght` and `level` from a
//! single preorder walk. Renumbering from scratch keeps the encoding exact after
//! every move, including moves between trees and to root level.
//!
//! Validation happens before any list is touched, so a rejected move leaves the
//! forest exactly as it was.

use crate::db::error::TreeStoreError;
use crate::models::{NodeId, Position, TreeNode};
use chrono::Utc;
use std::collections::HashMap;

/// Outcome of a successful move
#[derive(Debug, Clone)]
pub struct Relocation {
    /// The moved node with its new bounds
    pub moved: TreeNode,
    /// Every node whose stored fields changed (the moved node included)
    pub changed: Vec<TreeNode>,
}

/// In-memory view of every tree in a store
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: HashMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    root_level: i32,
}

impl Forest {
    pub fn new(root_level: i32) -> Self {
        Self {
            root_level,
            ..Default::default()
        }
    }

    /// Build from stored rows in any order
    ///
    /// Sibling order comes from `(tree_id, lft)`. A row whose parent is missing is
    /// treated as a root.
    pub fn from_nodes(nodes: impl IntoIterator<Item = TreeNode>, root_level: i32) -> Self {
        let mut sorted: Vec<TreeNode> = nodes.into_iter().collect();
        sorted.sort_by_key(|n| (n.tree_id, n.lft));

        let mut forest = Self::new(root_level);
        for node in &sorted {
            forest.nodes.insert(node.id, node.clone());
        }
        for node in sorted {
            match node.parent_id {
                Some(parent) if forest.nodes.contains_key(&parent) => {
                    forest.children.entry(parent).or_default().push(node.id)
                }
                _ => forest.roots.push(node.id),
            }
        }
        forest
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_level(&self) -> i32 {
        self.root_level
    }

    /// All nodes in `(tree_id, lft)` order
    pub fn preorder(&self) -> Vec<&TreeNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(node);
            }
            if let Some(children) = self.children.get(&id) {
                stack.extend(children.iter().rev().copied());
            }
        }
        out
    }

    /// Ancestors of `id`, nearest first
    ///
    /// Stops after `len()` steps, so a parent cycle in stored rows cannot loop.
    pub fn ancestors(&self, id: NodeId) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent_id);
        while let Some(parent_id) = current {
            if out.len() >= self.nodes.len() {
                break;
            }
            match self.nodes.get(&parent_id) {
                Some(parent) => {
                    out.push(parent);
                    current = parent.parent_id;
                }
                None => break,
            }
        }
        out
    }

    /// Append a new node as the last child of `parent_id` (or as the last tree)
    pub fn append(
        &mut self,
        id: NodeId,
        title: &str,
        parent_id: Option<NodeId>,
    ) -> Result<TreeNode, TreeStoreError> {
        if let Some(parent) = parent_id {
            if !self.nodes.contains_key(&parent) {
                return Err(TreeStoreError::node_not_found(parent));
            }
        }

        self.nodes
            .insert(id, TreeNode::new(id, title, parent_id, 0, 0, 0, 0));
        self.siblings_mut(parent_id).push(id);
        self.renumber();

        self.nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| TreeStoreError::node_not_found(id))
    }

    /// Move `node_id` with its subtree relative to `target_id`
    pub fn relocate(
        &mut self,
        node_id: NodeId,
        target_id: NodeId,
        position: Position,
    ) -> Result<Relocation, TreeStoreError> {
        self.check_move(node_id, target_id, position)?;

        let before = self.nodes.clone();

        let old_parent = self.nodes[&node_id].parent_id;
        self.siblings_mut(old_parent).retain(|id| *id != node_id);

        let new_parent = match position {
            Position::FirstChild => Some(target_id),
            Position::Left | Position::Right => self.nodes[&target_id].parent_id,
        };
        let siblings = self.siblings_mut(new_parent);
        let index = match position {
            Position::FirstChild => 0,
            Position::Left | Position::Right => {
                let target_index = siblings
                    .iter()
                    .position(|id| *id == target_id)
                    .unwrap_or(siblings.len());
                if position == Position::Right {
                    target_index + 1
                } else {
                    target_index
                }
            }
        };
        siblings.insert(index.min(siblings.len()), node_id);

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.parent_id = new_parent;
            node.modified_at = Utc::now();
        }
        self.renumber();

        let mut changed: Vec<TreeNode> = self
            .preorder()
            .into_iter()
            .filter(|node| {
                node.id == node_id
                    || before
                        .get(&node.id)
                        .map_or(true, |old| !old.same_position(node))
            })
            .cloned()
            .collect();
        changed.sort_by_key(|n| (n.tree_id, n.lft));

        let moved = self.nodes[&node_id].clone();
        Ok(Relocation { moved, changed })
    }

    fn check_move(
        &self,
        node_id: NodeId,
        target_id: NodeId,
        position: Position,
    ) -> Result<(), TreeStoreError> {
        if !self.nodes.contains_key(&node_id) {
            return Err(TreeStoreError::invalid_relocation(format!(
                "Node {} no longer exists.",
                node_id
            )));
        }
        if !self.nodes.contains_key(&target_id) {
            return Err(TreeStoreError::invalid_relocation(format!(
                "Target node {} no longer exists.",
                target_id
            )));
        }

        let relation = match position {
            Position::FirstChild => "child",
            Position::Left | Position::Right => "sibling",
        };
        if node_id == target_id {
            return Err(TreeStoreError::invalid_relocation(format!(
                "A node may not be made a {} of itself.",
                relation
            )));
        }
        if self.ancestors(target_id).iter().any(|a| a.id == node_id) {
            return Err(TreeStoreError::invalid_relocation(format!(
                "A node may not be made a {} of any of its descendants.",
                relation
            )));
        }
        Ok(())
    }

    fn siblings_mut(&mut self, parent_id: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent_id {
            Some(parent) => self.children.entry(parent).or_default(),
            None => &mut self.roots,
        }
    }

    fn renumber(&mut self) {
        let roots = self.roots.clone();
        for (index, root) in roots.into_iter().enumerate() {
            self.number_tree(root, index as i64 + 1);
        }
    }

    /// Preorder numbering of one tree with an explicit stack
    ///
    /// Frames are `(id, level, lft, next child index)`; `rght` is assigned when a
    /// frame is popped.
    fn number_tree(&mut self, root: NodeId, tree_id: i64) {
        let mut counter: i64 = 1;
        let mut stack: Vec<(NodeId, i32, i64, usize)> = vec![(root, self.root_level, counter, 0)];
        counter += 1;

        while let Some(frame) = stack.last_mut() {
            let (id, level, lft, next) = *frame;
            let child = self
                .children
                .get(&id)
                .and_then(|children| children.get(next))
                .copied();

            match child {
                Some(child) => {
                    frame.3 += 1;
                    stack.push((child, level + 1, counter, 0));
                    counter += 1;
                }
                None => {
                    stack.pop();
                    if let Some(node) = self.nodes.get_mut(&id) {
                        node.tree_id = tree_id;
                        node.lft = lft;
                        node.rght = counter;
                        node.level = level;
                    }
                    counter += 1;
                }
            }
        }
    }
}

/// Check that `nodes`, ordered by `(tree_id, lft)`, form a valid preorder encoding
///
/// Every node must sit inside its parent's bounds, one level below it, and
/// siblings must not overlap.
pub fn check_preorder(nodes: &[TreeNode]) -> Result<(), String> {
    let mut open: Vec<&TreeNode> = Vec::new();
    let mut current_tree = None;

    for node in nodes {
        if node.lft >= node.rght || (node.rght - node.lft - 1) % 2 != 0 {
            return Err(format!("node {} has malformed bounds", node.id));
        }
        if current_tree != Some(node.tree_id) {
            open.clear();
            current_tree = Some(node.tree_id);
        }
        while open.last().is_some_and(|top| top.rght < node.lft) {
            open.pop();
        }
        match open.last() {
            Some(parent) => {
                if node.rght > parent.rght {
                    return Err(format!("node {} overlaps node {}", node.id, parent.id));
                }
                if node.parent_id != Some(parent.id) {
                    return Err(format!(
                        "node {} is inside node {} but claims parent {:?}",
                        node.id, parent.id, node.parent_id
                    ));
                }
                if node.level != parent.level + 1 {
                    return Err(format!("node {} has level {}", node.id, node.level));
                }
            }
            None => {
                if node.parent_id.is_some() {
                    return Err(format!("node {} is outside its parent", node.id));
                }
            }
        }
        open.push(node);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root(1) -> [a(2) -> [a1(4)], b(3)]; second tree other(5)
    fn sample() -> Forest {
        let mut forest = Forest::new(0);
        forest.append(1, "root", None).unwrap();
        forest.append(2, "a", Some(1)).unwrap();
        forest.append(3, "b", Some(1)).unwrap();
        forest.append(4, "a1", Some(2)).unwrap();
        forest.append(5, "other", None).unwrap();
        forest
    }

    fn order(forest: &Forest) -> Vec<NodeId> {
        forest.preorder().iter().map(|n| n.id).collect()
    }

    fn assert_valid(forest: &Forest) {
        let nodes: Vec<TreeNode> = forest.preorder().into_iter().cloned().collect();
        check_preorder(&nodes).unwrap();
    }

    #[test]
    fn test_append_numbers_bounds() {
        let forest = sample();
        let root = forest.get(1).unwrap();
        assert_eq!((root.lft, root.rght, root.level, root.tree_id), (1, 8, 0, 1));
        let a1 = forest.get(4).unwrap();
        assert_eq!((a1.lft, a1.rght, a1.level), (3, 4, 2));
        let other = forest.get(5).unwrap();
        assert_eq!((other.tree_id, other.lft, other.rght), (2, 1, 2));
        assert_valid(&forest);
    }

    #[test]
    fn test_append_rejects_unknown_parent() {
        let mut forest = sample();
        let err = forest.append(9, "x", Some(42)).unwrap_err();
        assert!(matches!(err, TreeStoreError::NodeNotFound { id: 42 }));
    }

    #[test]
    fn test_relocate_left_of_sibling() {
        let mut forest = sample();
        let result = forest.relocate(3, 2, Position::Left).unwrap();
        assert_eq!(order(&forest), vec![1, 3, 2, 4, 5]);
        assert_eq!(result.moved.parent_id, Some(1));
        assert_eq!((result.moved.lft, result.moved.rght), (2, 3));
        assert_valid(&forest);
    }

    #[test]
    fn test_relocate_first_child_changes_level() {
        let mut forest = sample();
        let result = forest.relocate(3, 2, Position::FirstChild).unwrap();
        assert_eq!(order(&forest), vec![1, 2, 3, 4, 5]);
        assert_eq!(result.moved.parent_id, Some(2));
        assert_eq!(result.moved.level, 2);
        assert_valid(&forest);
    }

    #[test]
    fn test_relocate_subtree_to_new_tree() {
        let mut forest = sample();
        let result = forest.relocate(2, 1, Position::Right).unwrap();

        assert_eq!(order(&forest), vec![1, 3, 2, 4, 5]);
        assert!(result.moved.is_root());
        assert_eq!(result.moved.tree_id, 2);
        assert_eq!(forest.get(4).unwrap().level, 1);
        assert_eq!(forest.get(5).unwrap().tree_id, 3);
        assert_valid(&forest);
    }

    #[test]
    fn test_relocate_reports_only_changed_nodes() {
        let mut forest = sample();
        let result = forest.relocate(4, 3, Position::Right).unwrap();
        let changed: Vec<NodeId> = result.changed.iter().map(|n| n.id).collect();

        // Tree 2 keeps its bounds
        assert!(!changed.contains(&5));
        assert!(changed.contains(&4));
        assert_valid(&forest);
    }

    #[test]
    fn test_relocate_rejects_cycles_without_mutation() {
        let mut forest = sample();
        let snapshot = order(&forest);

        let err = forest.relocate(1, 4, Position::FirstChild).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A node may not be made a child of any of its descendants."
        );
        let err = forest.relocate(2, 2, Position::Left).unwrap_err();
        assert_eq!(err.to_string(), "A node may not be made a sibling of itself.");
        let err = forest.relocate(2, 99, Position::Right).unwrap_err();
        assert!(err.is_relocation_failure());

        assert_eq!(order(&forest), snapshot);
        assert_valid(&forest);
    }

    #[test]
    fn test_root_level_offset() {
        let mut forest = Forest::new(1);
        forest.append(1, "site", None).unwrap();
        let child = forest.append(2, "page", Some(1)).unwrap();
        assert_eq!(child.level, 2);
    }

    /// One path of `depth` nodes (ids 1..=depth) plus a separate root
    fn chain(depth: i64) -> Vec<TreeNode> {
        let last = 2 * depth;
        let mut nodes: Vec<TreeNode> = (1..=depth)
            .map(|id| {
                let parent = if id == 1 { None } else { Some(id - 1) };
                TreeNode::new(id, format!("n{}", id), parent, 1, id, last - id + 1, (id - 1) as i32)
            })
            .collect();
        nodes.push(TreeNode::new(depth + 1, "other", None, 2, 1, 2, 0));
        nodes
    }

    #[test]
    fn test_relocate_in_very_deep_tree() {
        let depth = 50_000;
        let mut forest = Forest::from_nodes(chain(depth), 0);

        let result = forest.relocate(depth + 1, 1, Position::Left).unwrap();
        assert_eq!(result.moved.tree_id, 1);
        assert_eq!((result.moved.lft, result.moved.rght), (1, 2));

        let deepest = forest.get(depth).unwrap();
        assert_eq!(deepest.tree_id, 2);
        assert_eq!(deepest.level, (depth - 1) as i32);
        assert_eq!(deepest.lft + 1, deepest.rght);
        assert_eq!(forest.get(1).unwrap().rght, 2 * depth);

        // The top of the chain cannot go under its deepest descendant
        let err = forest.relocate(1, depth, Position::FirstChild).unwrap_err();
        assert!(err.is_relocation_failure());
        assert_valid(&forest);
    }

    #[test]
    fn test_ancestors_stop_on_parent_cycle() {
        let looped = vec![
            TreeNode::new(1, "a", Some(2), 1, 1, 4, 0),
            TreeNode::new(2, "b", Some(1), 1, 2, 3, 1),
            TreeNode::new(3, "c", None, 2, 1, 2, 0),
        ];
        let forest = Forest {
            nodes: looped.into_iter().map(|n| (n.id, n)).collect(),
            roots: vec![3],
            children: HashMap::new(),
            root_level: 0,
        };

        let ancestors = forest.ancestors(1);
        assert!(ancestors.len() <= forest.len());
        assert_eq!(ancestors[0].id, 2);
    }

    #[test]
    fn test_check_preorder_detects_broken_encoding() {
        let root = TreeNode::new(1, "root", None, 1, 1, 4, 0);
        let child = TreeNode::new(2, "child", Some(1), 1, 2, 3, 1);
        assert!(check_preorder(&[root.clone(), child.clone()]).is_ok());

        let wrong_level = TreeNode { level: 3, ..child.clone() };
        assert!(check_preorder(&[root.clone(), wrong_level]).is_err());

        let escaped = TreeNode { lft: 5, rght: 6, ..child };
        assert!(check_preorder(&[root, escaped]).is_err());
    }
}
