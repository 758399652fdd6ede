//! Shared error taxonomy (spec §7) mapped onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum DfsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DfsError {
    pub fn status(&self) -> StatusCode {
        match self {
            DfsError::NotFound(_) => StatusCode::NOT_FOUND,
            DfsError::Conflict(_) => StatusCode::CONFLICT,
            DfsError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DfsError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DfsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DfsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        (status, body).into_response()
    }
}

/// Folds a failed outbound call (connection refused, timeout, non-2xx,
/// bad body) into the same taxonomy used for inbound errors, so AS can
/// treat "replica write failed" uniformly regardless of cause (spec §7).
impl From<reqwest::Error> for DfsError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            match status {
                StatusCode::NOT_FOUND => DfsError::NotFound(e.to_string()),
                StatusCode::CONFLICT => DfsError::Conflict(e.to_string()),
                StatusCode::BAD_REQUEST => DfsError::BadRequest(e.to_string()),
                _ => DfsError::Unavailable(e.to_string()),
            }
        } else {
            DfsError::Unavailable(e.to_string())
        }
    }
}

impl From<std::io::Error> for DfsError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => DfsError::NotFound(e.to_string()),
            _ => DfsError::Internal(e.to_string()),
        }
    }
}

pub type DfsResult<T> = Result<T, DfsError>;
