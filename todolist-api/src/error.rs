/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`, which converts to the JSON body
/// `{"error": <category>, "message": <text>}` with the matching status code.
///
/// # Example
///
/// ```
/// use todolist_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(id: i64) -> ApiResult<Json<Value>> {
///     if id < 0 {
///         return Err(ApiError::NotFound(format!("task {} was not found", id)));
///     }
///     Ok(Json(json!({ "id": id })))
/// }
/// ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use todolist_shared::service::{AuthFailure, ServiceError};
use todolist_shared::validation::FieldError;

/// Realm announced on every 401
pub const BASIC_REALM: &str = r#"Basic realm="Authentication Required""#;

/// Message for unknown routes and unparseable path IDs
pub const NOT_FOUND_MESSAGE: &str = "the requested URL was not found on the server";

/// Message for a known route hit with the wrong method
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "the method is not allowed for the requested URL";

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401) - missing or rejected Basic credentials
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Method not allowed (405)
    MethodNotAllowed(String),

    /// Datastore failure (500) with a client-safe message
    StoreFailure(String),

    /// Internal server error (500); details are logged, never sent
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category (e.g., "bad request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::MethodNotAllowed(msg) => write!(f, "Method not allowed: {}", msg),
            ApiError::StoreFailure(msg) => write!(f, "Store failure: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not found", msg),
            ApiError::MethodNotAllowed(msg) => {
                (StatusCode::METHOD_NOT_ALLOWED, "method not allowed", msg)
            }
            ApiError::StoreFailure(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error", msg)
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: category.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_REALM),
            );
        }
        response
    }
}

/// Convert validation errors to API errors
impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Convert service outcomes to API errors
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Data(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Store(msg) => ApiError::StoreFailure(msg),
        }
    }
}

/// Convert credential check failures to API errors
impl From<AuthFailure> for ApiError {
    fn from(err: AuthFailure) -> Self {
        match err {
            AuthFailure::UnknownLogin | AuthFailure::WrongPassword => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthFailure::Store => ApiError::InternalError(err.to_string()),
        }
    }
}
