use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::application::usecases::reference_resolver::ResolveError;
use crate::application::usecases::subscriptions::SubscriptionError;

/// JSON error envelope shared by every route.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn error_response(status: StatusCode, message: String, error: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            message,
            error,
        }),
    )
        .into_response()
}

/// Error type for the plain CRUD routers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, message, Some("not_found".to_string()))
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                message,
                Some("bad_request".to_string()),
            ),
            ApiError::Internal(_) => {
                // Don't leak internal error detail to the client.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        error_response(status, message, detail)
    }
}

impl From<ResolveError> for ApiError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::NotFound { .. } => ApiError::NotFound(value.to_string()),
            ResolveError::Internal(err) => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, detail) = match &self {
            SubscriptionError::Internal(_) => ("Internal server error".to_string(), None),
            other => (other.to_string(), Some(error_kind(other).to_string())),
        };

        error_response(status, message, detail)
    }
}

fn error_kind(err: &SubscriptionError) -> &'static str {
    match err {
        SubscriptionError::AccountNotFound(_)
        | SubscriptionError::UserNotFound(_)
        | SubscriptionError::UserWithoutAccount(_)
        | SubscriptionError::SubscriptionNotFound(_)
        | SubscriptionError::ReferenceNotFound { .. } => "not_found",
        SubscriptionError::Validation(_) => "validation",
        SubscriptionError::Provider { .. } => "provider",
        SubscriptionError::StaleAccount(_) => "conflict",
        SubscriptionError::Internal(_) => "internal",
    }
}
