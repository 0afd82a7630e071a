//! Listing Adapter
//!
//! Sits between a changelist UI and a [`TreeStore`]:
//!
//! - every listing query is ordered by `(tree_id, lft)` so rows always come out
//!   in preorder, whatever ordering the caller asked for
//! - AJAX commands are dispatched here; `move_node` runs the gesture through the
//!   [`MoveResolver`] and hands the result to the store's move primitive
//! - in browsing mode the listing shows one level at a time with breadcrumbs
//!
//! The three listing flavours are one adapter parameterized by [`ListingMode`].

use crate::config::{AdapterConfig, ListingMode};
use crate::db::{ListingQuery, NodeFilter, TreeFieldNames, TreeStore, TreeStoreError};
use crate::models::{parse_id, FormError, MoveNodeForm, NodeId, ParentChoice, TreeNode};
use crate::services::choice_field::{TreeChoice, TreeChoiceField};
use crate::services::error::ListingError;
use crate::services::move_resolver::{MoveGesture, MoveResolver};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The only AJAX command the adapter understands
pub const MOVE_NODE_COMMAND: &str = "move_node";

/// Query parameters that steer browsing; removed from the breadcrumb query
const TREE_PARAMS: [&str; 4] = ["level", "parent", "p", "q"];

/// Result of an AJAX command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AjaxResponse {
    /// The move was applied
    Ok,
    /// The store rejected the move; the tree is unchanged
    Fail(String),
}

impl AjaxResponse {
    /// Plain-text response body
    pub fn body(&self) -> String {
        match self {
            AjaxResponse::Ok => "OK".to_string(),
            AjaxResponse::Fail(message) => format!("FAIL: {}", message),
        }
    }
}

/// One rendered changelist page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeListPage {
    pub mode: ListingMode,
    pub is_browsing: bool,
    pub results: Vec<TreeNode>,
    /// Rows matching the filter across all pages
    pub result_count: usize,
    /// Zero-based page index
    pub page: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub show_all: bool,
    /// Node whose level is being browsed
    pub parent: Option<TreeNode>,
    /// Ancestors of `parent` including itself, root first
    pub crumbs: Option<Vec<TreeNode>>,
    /// Remaining query string for breadcrumb links
    pub crumb_query: String,
}

/// Changelist query parameters, first value wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ChangeListParams {
    level: Option<String>,
    parent: Option<String>,
    page: Option<String>,
    search: Option<String>,
    show_all: bool,
    crumb_query: String,
}

impl ChangeListParams {
    fn parse(params: &[(String, String)]) -> Self {
        let first = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        let mut crumbs = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            if !TREE_PARAMS.contains(&key.as_str()) {
                crumbs.append_pair(key, value);
            }
        }

        Self {
            level: first("level"),
            parent: first("parent"),
            page: first("p"),
            search: first("q"),
            show_all: params.iter().any(|(key, _)| key == "all"),
            crumb_query: crumbs.finish(),
        }
    }
}

/// Tree-aware changelist over a [`TreeStore`]
#[derive(Clone)]
pub struct ListingAdapter {
    store: Arc<dyn TreeStore>,
    resolver: MoveResolver,
    config: AdapterConfig,
}

impl ListingAdapter {
    pub fn new(store: Arc<dyn TreeStore>, config: AdapterConfig) -> Self {
        Self {
            store,
            resolver: MoveResolver::new(config.root_level),
            config,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    /// Replace whatever ordering `query` carries with tree order
    pub fn tree_ordered(query: ListingQuery) -> ListingQuery {
        query.order_by(TreeFieldNames::tree_order())
    }

    /// Run `query` in tree order
    pub async fn list_ordered(&self, query: ListingQuery) -> Result<Vec<TreeNode>, ListingError> {
        Ok(self.store.query_nodes(&Self::tree_ordered(query)).await?)
    }

    /// Browsing applies in browsing mode unless a text search is running
    pub fn is_browsing(&self, params: &[(String, String)]) -> bool {
        self.config.mode == ListingMode::Browsing && !params.iter().any(|(key, _)| key == "q")
    }

    /// Dispatch an AJAX command
    ///
    /// Returns `Ok(AjaxResponse::Fail(..))` when the store rejects a move; errors
    /// are reserved for malformed requests, unknown ids and storage failures.
    #[instrument(skip(self, payload))]
    pub async fn handle_ajax(
        &self,
        command: &str,
        payload: &HashMap<String, String>,
    ) -> Result<AjaxResponse, ListingError> {
        match command {
            MOVE_NODE_COMMAND => {
                let form = MoveNodeForm::from_fields(payload)?;
                self.move_node(form).await
            }
            other => {
                warn!("Rejected AJAX command {:?}", other);
                Err(ListingError::unrecognized_command(other))
            }
        }
    }

    async fn require(&self, field: &str, id: NodeId) -> Result<TreeNode, ListingError> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| ListingError::node_not_found(field, id))
    }

    async fn move_node(&self, form: MoveNodeForm) -> Result<AjaxResponse, ListingError> {
        let node = self.require("node", form.node).await?;
        let target = self.require("target", form.target).await?;
        let desired_parent = match form.parent {
            ParentChoice::Current => match node.parent_id {
                Some(parent_id) => Some(self.require("parent", parent_id).await?),
                None => None,
            },
            ParentChoice::Root => None,
            ParentChoice::Node(parent_id) => Some(self.require("parent", parent_id).await?),
        };

        let gesture = MoveGesture {
            node: &node,
            target: &target,
            desired_parent: desired_parent.as_ref(),
            hint: form.hint,
        };
        let ancestors = if self.resolver.needs_normalization(&gesture) {
            self.store.get_ancestors(target.id, true, false).await?
        } else {
            Vec::new()
        };
        let request = self.resolver.resolve(&gesture, &ancestors)?;

        match self
            .store
            .move_node(request.node_id, request.target_id, request.position)
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_relocation_failure() => {
                warn!(
                    "Move of node {} {} node {} rejected: {}",
                    request.node_id, request.position, request.target_id, err
                );
                return Ok(AjaxResponse::Fail(err.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        let moved = self.require("node", node.id).await?;
        info!(
            "Moved node {} {} node {} (tree {}, bounds {}..{}, level {})",
            moved.id,
            request.position,
            request.target_id,
            moved.tree_id,
            moved.lft,
            moved.rght,
            moved.level
        );
        Ok(AjaxResponse::Ok)
    }

    /// Build one changelist page from request query parameters
    #[instrument(skip(self))]
    pub async fn changelist(
        &self,
        params: &[(String, String)],
    ) -> Result<ChangeListPage, ListingError> {
        let parsed = ChangeListParams::parse(params);
        let is_browsing = self.is_browsing(params);

        let mut filter = NodeFilter {
            search: parsed.search.clone().filter(|q| !q.trim().is_empty()),
            ..Default::default()
        };
        if is_browsing {
            if let Some(raw) = &parsed.parent {
                filter.parent_id = Some(parse_id("parent", raw)?);
            }
            if let Some(raw) = &parsed.level {
                let level = raw.trim().parse::<i32>().map_err(|_| FormError::InvalidId {
                    field: "level".to_string(),
                    value: raw.clone(),
                })?;
                filter.level = Some(level);
            }
            if parsed.parent.is_none() && parsed.level.is_none() {
                filter.level = Some(self.config.root_level + 1);
            }
        }

        let result_count = self.store.count_nodes(&filter).await?;
        let per_page = self.config.list_per_page.max(1);
        let num_pages = result_count.div_ceil(per_page).max(1);
        let show_all = parsed.show_all && result_count <= self.config.list_max_show_all;

        let page = parsed
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p < num_pages)
            .unwrap_or(0);

        let query = if show_all {
            ListingQuery::new(filter)
        } else {
            ListingQuery::new(filter).window(page * per_page, per_page)
        };
        let results = self.list_ordered(query).await?;

        let (parent, crumbs) = if is_browsing {
            self.breadcrumbs(parsed.parent.as_deref()).await?
        } else {
            (None, None)
        };

        Ok(ChangeListPage {
            mode: self.config.mode,
            is_browsing,
            results,
            result_count,
            page: if show_all { 0 } else { page },
            num_pages: if show_all { 1 } else { num_pages },
            per_page,
            show_all,
            parent,
            crumbs,
            crumb_query: parsed.crumb_query,
        })
    }

    /// The browsed parent and its ancestor chain
    ///
    /// Falls back to the first root when `parent` is absent or does not resolve.
    async fn breadcrumbs(
        &self,
        parent: Option<&str>,
    ) -> Result<(Option<TreeNode>, Option<Vec<TreeNode>>), ListingError> {
        let requested = match parent.and_then(|raw| raw.trim().parse::<NodeId>().ok()) {
            Some(id) => self.store.get_node(id).await?,
            None => None,
        };
        let parent = match requested {
            Some(node) => Some(node),
            None => self.store.first_root().await?,
        };

        let Some(parent) = parent else {
            return Ok((None, None));
        };

        match self.store.get_ancestors(parent.id, false, true).await {
            Ok(crumbs) => Ok((Some(parent), Some(crumbs))),
            Err(TreeStoreError::NodeNotFound { .. }) => Ok((Some(parent), None)),
            Err(err) => Err(err.into()),
        }
    }

    /// Every node in tree order as indented select options
    pub async fn choices(
        &self,
        level_indicator: Option<&str>,
    ) -> Result<Vec<TreeChoice>, ListingError> {
        let field = level_indicator
            .map(|indicator| TreeChoiceField::new(indicator))
            .unwrap_or_default();
        let nodes = self.list_ordered(ListingQuery::default()).await?;
        Ok(field.choices(&nodes))
    }
}
