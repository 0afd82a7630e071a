//! Tree choice labels
//!
//! Renders nodes as options of a select widget, indented by repeating a level
//! indicator once per level:
//!
//! ```text
//!  root
//! --- first_level_child
//! ------ second_level_child
//! ```

use crate::models::{NodeId, TreeNode};
use serde::Serialize;

/// Indicator used when none is configured
pub const DEFAULT_LEVEL_INDICATOR: &str = "---";

/// One `<option>` of a tree select
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeChoice {
    pub id: NodeId,
    pub label: String,
}

/// Labels nodes by depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChoiceField {
    level_indicator: String,
}

impl Default for TreeChoiceField {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL_INDICATOR)
    }
}

impl TreeChoiceField {
    pub fn new(level_indicator: impl Into<String>) -> Self {
        Self {
            level_indicator: level_indicator.into(),
        }
    }

    pub fn level_indicator(&self) -> &str {
        &self.level_indicator
    }

    /// Option label for `node`
    pub fn label_from_instance(&self, node: &TreeNode) -> String {
        let depth = usize::try_from(node.level).unwrap_or(0);
        format!("{} {}", self.level_indicator.repeat(depth), node.title)
    }

    /// Options for `nodes`, in the order given
    pub fn choices(&self, nodes: &[TreeNode]) -> Vec<TreeChoice> {
        nodes
            .iter()
            .map(|node| TreeChoice {
                id: node.id,
                label: self.label_from_instance(node),
            })
            .collect()
    }
}
