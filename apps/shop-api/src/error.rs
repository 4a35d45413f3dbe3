//! Error types for the Shop API.
//!
//! `ApiError` is the HTTP-facing error; every lower-layer error
//! (`CoreError`, `DbError`, `GatewayError`) converts into it and the
//! `IntoResponse` impl maps each variant to a status code and a JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::gateway::GatewayError;
use haven_core::CoreError;
use haven_db::DbError;

/// Shop API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidPhone { .. } | CoreError::QuantityTooLarge { .. } => {
                ApiError::InvalidRequest(error.to_string())
            }
            CoreError::EmptyCart
            | CoreError::InsufficientStock { .. }
            | CoreError::CartTooLarge { .. }
            | CoreError::CartChanged { .. }
            | CoreError::PaymentNotCompleted { .. } => ApiError::Conflict(error.to_string()),
            CoreError::GatewayRejected { .. } => {
                ApiError::Gateway(GatewayError::Rejected(error.to_string()))
            }
            CoreError::TotalOverflow
            | CoreError::MissingCallbackField { .. }
            | CoreError::MalformedCallbackField { .. } => ApiError::Internal(error.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::NotFound { .. } => ApiError::NotFound(error.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Conflict(error.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_connection_failure_is_a_server_error() {
        // A retrying caller (the payment provider redelivers on non-2xx)
        // must see 5xx when the database was unavailable, not a 4xx that
        // would bury the payload.
        let err = ApiError::from(DbError::ConnectionFailed("pool closed".to_string()));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_domain_conflicts_are_client_errors() {
        assert_eq!(
            status_of(ApiError::from(CoreError::EmptyCart)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::from(DbError::NotFound {
                entity: "Order".to_string(),
                id: "o-1".to_string(),
            })),
            StatusCode::NOT_FOUND
        );
    }
}
