//! HTTP error handling for the changelist endpoint
//!
//! Maps adapter errors onto status codes with a JSON body. Rejected moves never
//! reach this type: they are answered with a plain-text `FAIL: ...` and 200.

use crate::db::TreeStoreError;
use crate::services::ListingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Plain-text body returned for unknown AJAX commands
pub const NOT_UNDERSTOOD: &str = "AJAX request not understood.";

/// JSON error response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NODE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_INPUT" | "UNRECOGNIZED_COMMAND" => StatusCode::BAD_REQUEST,
            "INVALID_MOVE" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ListingError> for HttpError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::UnrecognizedCommand { command } => {
                HttpError::with_details(NOT_UNDERSTOOD, "UNRECOGNIZED_COMMAND", command)
            }
            ListingError::Form(e) => HttpError::new(e.to_string(), "INVALID_INPUT"),
            ListingError::NodeNotFound { .. } => HttpError::new(err.to_string(), "NODE_NOT_FOUND"),
            ListingError::Resolve(e) => HttpError::new(e.to_string(), "INVALID_INPUT"),
            ListingError::Store(e) => e.into(),
        }
    }
}

impl From<TreeStoreError> for HttpError {
    fn from(err: TreeStoreError) -> Self {
        match err {
            TreeStoreError::NodeNotFound { .. } => HttpError::new(err.to_string(), "NODE_NOT_FOUND"),
            // Fallback for callers converting store errors directly; the adapter
            // answers rejected moves with a plain-text FAIL before this point.
            TreeStoreError::InvalidRelocation(_) | TreeStoreError::Conflict(_) => {
                HttpError::new(err.to_string(), "INVALID_MOVE")
            }
            TreeStoreError::InvalidFieldName { .. } => {
                HttpError::new(err.to_string(), "CONFIGURATION_ERROR")
            }
            TreeStoreError::Database(e) => {
                HttpError::with_details("Database operation failed", "DATABASE_ERROR", e.to_string())
            }
        }
    }
}
