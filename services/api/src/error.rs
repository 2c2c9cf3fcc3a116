//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use report_assistant_core::ports::PortError;
use serde_json::json;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request carried no usable `x-user-id` header.
    #[error("Missing or invalid x-user-id header")]
    Unauthorized,

    /// The request body could not be read (bad multipart, bad base64, missing field).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Port(PortError::NotFound(_)) | ApiError::Port(PortError::ReportNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Port(PortError::Validation(_))
            | ApiError::Port(PortError::EmptyDocument)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Port(PortError::MalformedAnalysis(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A body that is not valid JSON for the handler's payload type is a client error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::BAD_GATEWAY => {
                error!(error = %self, "Analysis engine broke its response contract");
                "The analysis service returned an invalid response".to_string()
            }
            s if s.is_server_error() => {
                // The cause stays in the logs; clients get a generic message.
                error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            _ => match &self {
                ApiError::Port(port) => port.to_string(),
                other => other.to_string(),
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn port_errors_map_to_statuses() {
        let cases = [
            (PortError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PortError::ReportNotFound("x".into()), StatusCode::NOT_FOUND),
            (PortError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PortError::EmptyDocument, StatusCode::BAD_REQUEST),
            (PortError::MalformedAnalysis("x".into()), StatusCode::BAD_GATEWAY),
            (PortError::Processing, StatusCode::INTERNAL_SERVER_ERROR),
            (PortError::Unexpected("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn server_errors_hide_their_cause() {
        let response = ApiError::Port(PortError::Unexpected("password=hunter2".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_text(response).await;
        assert!(!body.contains("hunter2"));
        assert!(body.contains("Internal server error"));
    }

    #[tokio::test]
    async fn malformed_analysis_hides_the_engine_reply() {
        let response = ApiError::Port(PortError::MalformedAnalysis("raw: Sure! ...".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(!body_text(response).await.contains("Sure!"));
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let response = ApiError::Port(PortError::Validation("message is required".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("message is required"));
    }
}
