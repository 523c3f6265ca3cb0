//! Unified error handling for the sync service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::FetchError;
use crate::sync::SyncError;

/// Application-level error type for the sync service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Sync or webhook-apply operation failed.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => repository_status(e),
            Self::Sync(e) => sync_status(e),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details are not exposed.
    fn message(&self) -> String {
        match self {
            Self::Database(e) => match e {
                RepositoryError::NotFound => "not found".to_string(),
                RepositoryError::Conflict(msg) => msg.clone(),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Sync(e) => match e {
                SyncError::Store(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_),
                ) => "Internal server error".to_string(),
                SyncError::Fetch(_) => "External service error".to_string(),
                _ => e.to_string(),
            },
            Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        }
    }
}

fn repository_status(e: &RepositoryError) -> StatusCode {
    match e {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn sync_status(e: &SyncError) -> StatusCode {
    match e {
        SyncError::TenantNotFound(_) => StatusCode::NOT_FOUND,
        SyncError::SignatureRejected => StatusCode::UNAUTHORIZED,
        SyncError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        SyncError::Fetch(FetchError::Transient(_) | FetchError::RateLimited(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SyncError::Fetch(_) => StatusCode::BAD_GATEWAY,
        SyncError::Store(e) => repository_status(e),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server-side failures with Sentry; client errors are request noise
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Sync request error"
            );
        } else {
            tracing::warn!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
