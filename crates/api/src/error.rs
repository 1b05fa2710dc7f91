//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Store error reaching the API directly (user management paths).
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => return domain_error_to_response(err),
            ApiError::Store(err) => return store_error_to_response(err).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        // The shortage payload is the response body: a fixed detail
        // message plus up to three substitutes, never partial.
        DomainError::InsufficientStock { recommendations } => {
            (StatusCode::CONFLICT, Json(recommendations)).into_response()
        }
        DomainError::OrderNotFound(_)
        | DomainError::ProductNotFound(_)
        | DomainError::ItemNotFound(_) => {
            (StatusCode::NOT_FOUND, error_body(&err)).into_response()
        }
        DomainError::DuplicateItem | DomainError::Validation(_) => {
            (StatusCode::BAD_REQUEST, error_body(&err)).into_response()
        }
        DomainError::InvalidQuantity { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, error_body(&err)).into_response()
        }
        DomainError::Store(inner) => store_error_to_response(inner).into_response(),
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        StoreError::DuplicateEmail(_) | StoreError::DuplicateItem { .. } => {
            StatusCode::BAD_REQUEST
        }
        StoreError::OrderNotFound(_)
        | StoreError::ProductNotFound(_)
        | StoreError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InsufficientStock { .. } | StoreError::ProductInUse(_) => {
            StatusCode::CONFLICT
        }
        _ => {
            tracing::error!(error = %err, "store error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error_body(&err))
}

fn error_body(err: &impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": err.to_string() }))
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
