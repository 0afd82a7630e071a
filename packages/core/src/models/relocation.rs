//! Relocation Types
//!
//! Values exchanged between the drag-and-drop UI, the move resolver and the
//! tree store's move primitive. None of these are persisted.

use super::tree_node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Literal `parent` value meaning "keep the node's existing parent"
pub const PARENT_CURRENT: &str = "current";

/// Literal `parent` value meaning "make the node a root"
pub const PARENT_NONE: &str = "false";

/// Literal `position` value sent when dropping above the first root
pub const POSITION_BEFORE: &str = "before";

/// Errors raised while reading gesture fields from an untrusted form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid id for field '{field}': {value:?}")]
    InvalidId { field: String, value: String },
}

/// Side of the target a node is moved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// Becomes the first child of the target
    FirstChild,
    /// Becomes the sibling immediately before the target
    Left,
    /// Becomes the sibling immediately after the target's subtree
    Right,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::FirstChild => "first-child",
            Position::Left => "left",
            Position::Right => "right",
        };
        f.write_str(name)
    }
}

/// Position hint as sent by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionHint {
    /// `"before"`: only sent when the node is dropped above the very first root
    Before,
    /// Any other value, or no value at all
    After,
}

impl PositionHint {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(POSITION_BEFORE) => PositionHint::Before,
            _ => PositionHint::After,
        }
    }
}

/// Desired parent as sent by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentChoice {
    /// Keep whatever parent the node has now
    Current,
    /// Move to root level
    Root,
    /// Move under the given node
    Node(NodeId),
}

impl ParentChoice {
    pub fn parse(raw: &str) -> Result<Self, FormError> {
        match raw.trim() {
            PARENT_CURRENT => Ok(ParentChoice::Current),
            PARENT_NONE => Ok(ParentChoice::Root),
            other => parse_id("parent", other).map(ParentChoice::Node),
        }
    }
}

/// A single instruction for the tree store's move primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocationRequest {
    pub node_id: NodeId,
    pub target_id: NodeId,
    pub position: Position,
}

/// Parsed fields of a `move_node` AJAX request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveNodeForm {
    pub node: NodeId,
    pub target: NodeId,
    pub hint: PositionHint,
    pub parent: ParentChoice,
}

impl MoveNodeForm {
    /// Read `node`, `target`, `position` and `parent` from form fields
    ///
    /// `position` is optional; an absent `parent` is an error rather than an
    /// implicit "current" so that a truncated request never moves anything.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, FormError> {
        let node = parse_id("node", required(fields, "node")?)?;
        let target = parse_id("target", required(fields, "target")?)?;
        let parent = ParentChoice::parse(required(fields, "parent")?)?;
        let hint = PositionHint::parse(fields.get("position").map(String::as_str));

        Ok(Self {
            node,
            target,
            hint,
            parent,
        })
    }
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, FormError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| FormError::MissingField(name.to_string()))
}

pub(crate) fn parse_id(field: &str, raw: &str) -> Result<NodeId, FormError> {
    raw.trim().parse::<NodeId>().map_err(|_| FormError::InvalidId {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
