//! Changelist endpoints
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /changelist` - Tree-ordered listing page (`level`, `parent`, `p`, `q`, `all`)
//! - `POST /changelist` - AJAX commands (`__cmd=move_node`, form-encoded)
//! - `GET /changelist/choices` - Indented select options (`level_indicator`)

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::http::{AppState, HttpError, NOT_UNDERSTOOD};
use crate::services::{ChangeListPage, ListingError, TreeChoice};

/// Form field carrying the AJAX command name
pub const COMMAND_FIELD: &str = "__cmd";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Query parameters for the choices endpoint
#[derive(Debug, Deserialize)]
pub struct ChoicesQuery {
    level_indicator: Option<String>,
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:3001/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Render one changelist page
///
/// ```bash
/// curl "http://localhost:3001/changelist?parent=4&p=0"
/// ```
async fn changelist(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ChangeListPage>, HttpError> {
    let page = state.adapter.changelist(&params).await?;
    Ok(Json(page))
}

/// Dispatch an AJAX command
///
/// Answers `OK` or `FAIL: <message>` as plain text with 200; unknown commands get
/// a plain-text 400.
///
/// ```bash
/// curl -X POST http://localhost:3001/changelist \
///   -d '__cmd=move_node&node=5&target=3&position=after&parent=current'
/// ```
async fn changelist_command(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let command = fields.get(COMMAND_FIELD).map(String::as_str).unwrap_or_default();

    match state.adapter.handle_ajax(command, &fields).await {
        Ok(outcome) => (StatusCode::OK, outcome.body()).into_response(),
        Err(ListingError::UnrecognizedCommand { .. }) => {
            (StatusCode::BAD_REQUEST, NOT_UNDERSTOOD).into_response()
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Indented options for a tree select
async fn choices(
    State(state): State<AppState>,
    Query(query): Query<ChoicesQuery>,
) -> Result<Json<Vec<TreeChoice>>, HttpError> {
    let choices = state
        .adapter
        .choices(query.level_indicator.as_deref())
        .await?;
    Ok(Json(choices))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/changelist", get(changelist).post(changelist_command))
        .route("/changelist/choices", get(choices))
        .with_state(state)
}
