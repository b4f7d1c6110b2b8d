//! Error types for the discovery API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type for discovery API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned for every authentication failure
pub const UNAUTHORIZED_MESSAGE: &str = "invalid or missing token";

/// Error type for discovery API operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Authentication failed (invalid or missing token)
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// Configuration error (bad key material, unsupported algorithm)
    #[error("configuration error: {0}")]
    Config(String),

    /// Key set could not be fetched
    #[error("jwks error: {0}")]
    Jwks(String),

    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // Never tell the caller why their token was rejected
            Error::Unauthorized(_) => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string()),
            Error::Kube(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Error::Config(_) | Error::Jwks(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": message,
            "code": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Error::Unauthorized(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Jwks(e.to_string())
    }
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        Error::Kube(e.to_string())
    }
}
