//! HTTP surface for the listing adapter
//!
//! One router exposes a single changelist: `GET` renders a page, `POST` carries
//! AJAX commands from the drag-and-drop UI. Requests are traced through
//! `tower_http::trace::TraceLayer`.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p outliner-core --bin outliner-dev-server --features dev-server
//! ```

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::ListingAdapter;

mod changelist_endpoints;
mod http_error;

pub use changelist_endpoints::{HealthStatus, COMMAND_FIELD};
pub use http_error::{HttpError, NOT_UNDERSTOOD};

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<ListingAdapter>,
}

impl AppState {
    pub fn new(adapter: ListingAdapter) -> Self {
        Self {
            adapter: Arc::new(adapter),
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(changelist_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Serve the changelist on `127.0.0.1:{port}`
///
/// # Errors
///
/// Returns error if the server fails to bind or stops abnormally.
pub async fn start_server(adapter: ListingAdapter, port: u16) -> anyhow::Result<()> {
    let mode = adapter.config().mode;
    let app = create_router(AppState::new(adapter));

    let addr = format!("127.0.0.1:{}", port);
    tracing::info!("Outliner changelist ({:?} mode) listening on http://{}", mode, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
