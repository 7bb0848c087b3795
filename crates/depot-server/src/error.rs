use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use depot_catalog::CatalogError;
use depot_ingest::IngestError;
use depot_store::StoreError;
use depot_types::TypeError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("authorization denied: {action}")]
    AuthorizationDenied { action: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TypeError> for ServerError {
    fn from(e: TypeError) -> Self {
        ServerError::InvalidInput(e.to_string())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::NotFound(_) | ServerError::Ingest(IngestError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ServerError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ServerError::Conflict(_) | ServerError::Ingest(IngestError::Conflict(_)) => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            ServerError::InvalidInput(_) | ServerError::Ingest(IngestError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT")
            }
            ServerError::AuthFailed(_) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
            ServerError::AuthorizationDenied { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ServerError::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_types::Version;

    #[test]
    fn status_mapping() {
        let cases = [
            (ServerError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ServerError::Ingest(IngestError::NotFound("release 1".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::Ingest(IngestError::Conflict(Version::new("1.0").unwrap())),
                StatusCode::CONFLICT,
            ),
            (
                ServerError::from(TypeError::InvalidHex("zz".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ServerError::AuthFailed("no".into()), StatusCode::UNAUTHORIZED),
            (
                ServerError::AuthorizationDenied { action: "write:x".into() },
                StatusCode::FORBIDDEN,
            ),
            (ServerError::PayloadTooLarge { limit: 1 }, StatusCode::PAYLOAD_TOO_LARGE),
            (
                ServerError::Ingest(IngestError::Catalog(CatalogError::Poisoned)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
