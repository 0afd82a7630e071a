//! MemoryTreeStore - TreeStore Implementation held in process memory
//!
//! Backs the demo server and the test suites. All state lives in one `Forest`
//! behind a `tokio::sync::RwLock`; writers hold the write guard for the whole
//! move, which serializes concurrent relocations.

use crate::db::error::TreeStoreError;
use crate::db::nested_set::Forest;
use crate::db::tree_store::{ListingQuery, NodeFilter, OrderTerm, TreeColumn, TreeStore};
use crate::models::{NodeId, Position, TreeNode};
use async_trait::async_trait;
use std::cmp::Ordering;
use tokio::sync::RwLock;

struct State {
    forest: Forest,
    next_id: NodeId,
}

/// Process-local tree store
pub struct MemoryTreeStore {
    state: RwLock<State>,
}

impl Default for MemoryTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTreeStore {
    /// Empty store with roots at level 0
    pub fn new() -> Self {
        Self::with_root_level(0)
    }

    /// Empty store whose roots sit at `root_level`
    pub fn with_root_level(root_level: i32) -> Self {
        Self {
            state: RwLock::new(State {
                forest: Forest::new(root_level),
                next_id: 1,
            }),
        }
    }

    /// Store pre-populated with existing rows
    ///
    /// Bounds are taken as given for sibling order and renumbered on the next
    /// write.
    pub fn from_nodes(nodes: Vec<TreeNode>, root_level: i32) -> Self {
        let next_id = nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        Self {
            state: RwLock::new(State {
                forest: Forest::from_nodes(nodes, root_level),
                next_id,
            }),
        }
    }

    /// Every node in tree order
    pub async fn snapshot(&self) -> Vec<TreeNode> {
        let state = self.state.read().await;
        state.forest.preorder().into_iter().cloned().collect()
    }
}

fn compare(a: &TreeNode, b: &TreeNode, ordering: &[OrderTerm]) -> Ordering {
    for term in ordering {
        let ord = match term.column {
            TreeColumn::Id => a.id.cmp(&b.id),
            TreeColumn::Title => a.title.cmp(&b.title),
            TreeColumn::TreeId => a.tree_id.cmp(&b.tree_id),
            TreeColumn::Left => a.lft.cmp(&b.lft),
            TreeColumn::Right => a.rght.cmp(&b.rght),
            TreeColumn::Level => a.level.cmp(&b.level),
        };
        let ord = if term.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

#[async_trait]
impl TreeStore for MemoryTreeStore {
    async fn get_node(&self, id: NodeId) -> Result<Option<TreeNode>, TreeStoreError> {
        let state = self.state.read().await;
        Ok(state.forest.get(id).cloned())
    }

    async fn get_ancestors(
        &self,
        id: NodeId,
        ascending: bool,
        include_self: bool,
    ) -> Result<Vec<TreeNode>, TreeStoreError> {
        let state = self.state.read().await;
        let node = state
            .forest
            .get(id)
            .cloned()
            .ok_or_else(|| TreeStoreError::node_not_found(id))?;

        let mut ancestors: Vec<TreeNode> =
            state.forest.ancestors(id).into_iter().cloned().collect();
        if include_self {
            ancestors.insert(0, node);
        }
        if !ascending {
            ancestors.reverse();
        }
        Ok(ancestors)
    }

    async fn first_root(&self) -> Result<Option<TreeNode>, TreeStoreError> {
        let state = self.state.read().await;
        Ok(state.forest.preorder().first().map(|n| (*n).clone()))
    }

    async fn query_nodes(&self, query: &ListingQuery) -> Result<Vec<TreeNode>, TreeStoreError> {
        let state = self.state.read().await;
        let mut rows: Vec<TreeNode> = state
            .forest
            .preorder()
            .into_iter()
            .filter(|n| query.filter.matches(n))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare(a, b, &query.ordering));

        let rows = rows.into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn count_nodes(&self, filter: &NodeFilter) -> Result<usize, TreeStoreError> {
        let state = self.state.read().await;
        Ok(state
            .forest
            .preorder()
            .into_iter()
            .filter(|n| filter.matches(n))
            .count())
    }

    async fn insert_node(
        &self,
        title: &str,
        parent_id: Option<NodeId>,
    ) -> Result<TreeNode, TreeStoreError> {
        let mut state = self.state.write().await;
        let id = state.next_id;
        let node = state.forest.append(id, title, parent_id)?;
        state.next_id += 1;
        Ok(node)
    }

    async fn move_node(
        &self,
        node_id: NodeId,
        target_id: NodeId,
        position: Position,
    ) -> Result<TreeNode, TreeStoreError> {
        let mut state = self.state.write().await;
        let relocation = state.forest.relocate(node_id, target_id, position)?;
        tracing::debug!(
            "Relocated node {} ({} rows renumbered)",
            node_id,
            relocation.changed.len()
        );
        Ok(relocation.moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryTreeStore {
        let store = MemoryTreeStore::new();
        let root = store.insert_node("Root", None).await.unwrap();
        let a = store.insert_node("Alpha", Some(root.id)).await.unwrap();
        store.insert_node("Beta", Some(root.id)).await.unwrap();
        store.insert_node("Alpha child", Some(a.id)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_ancestors_in_both_directions() {
        let store = seeded().await;

        let ascending = store.get_ancestors(4, true, false).await.unwrap();
        assert_eq!(ascending.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 1]);

        let descending = store.get_ancestors(4, false, true).await.unwrap();
        assert_eq!(
            descending.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![1, 2, 4]
        );
    }

    #[tokio::test]
    async fn test_ancestors_of_missing_node() {
        let store = seeded().await;
        let err = store.get_ancestors(99, true, false).await.unwrap_err();
        assert!(matches!(err, TreeStoreError::NodeNotFound { id: 99 }));
    }

    #[tokio::test]
    async fn test_query_honors_ordering_and_window() {
        let store = seeded().await;

        let by_title = store
            .query_nodes(&ListingQuery::default().order_by(vec![OrderTerm::desc(TreeColumn::Title)]))
            .await
            .unwrap();
        assert_eq!(by_title[0].title, "Root");

        let window = store
            .query_nodes(
                &ListingQuery::default()
                    .order_by(crate::db::TreeFieldNames::tree_order())
                    .window(1, 2),
            )
            .await
            .unwrap();
        assert_eq!(window.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_count_nodes_applies_filter() {
        let store = seeded().await;
        let filter = NodeFilter {
            level: Some(1),
            ..Default::default()
        };
        assert_eq!(store.count_nodes(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ids_continue_after_from_nodes() {
        let store = MemoryTreeStore::from_nodes(vec![TreeNode::new(7, "Seven", None, 1, 1, 2, 0)], 0);
        let node = store.insert_node("Next", None).await.unwrap();
        assert_eq!(node.id, 8);
        assert_eq!(node.tree_id, 2);
    }

    #[tokio::test]
    async fn test_move_beside_root_of_deep_chain() {
        let depth: i64 = 50_000;
        let mut nodes: Vec<TreeNode> = (1..=depth)
            .map(|id| {
                let parent = if id == 1 { None } else { Some(id - 1) };
                TreeNode::new(id, "link", parent, 1, id, 2 * depth - id + 1, (id - 1) as i32)
            })
            .collect();
        nodes.push(TreeNode::new(depth + 1, "other", None, 2, 1, 2, 0));
        let store = MemoryTreeStore::from_nodes(nodes, 0);

        let moved = store.move_node(depth + 1, 1, Position::Left).await.unwrap();
        assert_eq!(moved.tree_id, 1);

        let deepest = store.get_node(depth).await.unwrap().unwrap();
        assert_eq!(deepest.tree_id, 2);
        assert_eq!(deepest.level, (depth - 1) as i32);
        assert_eq!(store.get_ancestors(depth, true, false).await.unwrap().len(), (depth - 1) as usize);
    }
}
