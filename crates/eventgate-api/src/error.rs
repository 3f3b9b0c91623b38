//! HTTP error mapping for the ingress endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use eventgate_core::error::DomainError;

/// JSON body returned for request failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable failure reason.
    pub error: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            DomainError::Validation(reason) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: reason })).into_response()
            }
            DomainError::IdempotencyConflict => (
                StatusCode::CONFLICT,
                Json(ErrorBody {
                    error: "Idempotency key was reused with a different payload.".to_owned(),
                }),
            )
                .into_response(),
            DomainError::Publish(reason) => {
                tracing::error!(%reason, "log publish failed");
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
            DomainError::Persistence(reason) | DomainError::Fanout(reason) => {
                tracing::error!(%reason, "infrastructure failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal error".to_owned(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
