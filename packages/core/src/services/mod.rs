//! Business Services
//!
//! This module contains the logic layered on top of a tree store:
//!
//! - `MoveResolver` - Turns drag-and-drop gestures into relocation requests
//! - `ListingAdapter` - Tree-ordered changelists, browsing and AJAX dispatch
//! - `TreeChoiceField` - Indented option labels for tree select widgets

pub mod choice_field;
pub mod error;
pub mod listing_adapter;
pub mod move_resolver;

pub use choice_field::{TreeChoice, TreeChoiceField, DEFAULT_LEVEL_INDICATOR};
pub use error::{ListingError, ResolveError};
pub use listing_adapter::{AjaxResponse, ChangeListPage, ListingAdapter, MOVE_NODE_COMMAND};
pub use move_resolver::{MoveGesture, MoveResolver};
