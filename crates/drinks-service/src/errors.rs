//! Drinks service error types.
//!
//! Two layers:
//!
//! - [`AuthError`] is the closed taxonomy produced by the authorization
//!   pipeline. Every variant carries its HTTP status, a machine-readable code
//!   and a human-readable description.
//! - [`ApiError`] is what handlers return. Auth failures are wrapped verbatim
//!   so the caller sees the exact status and code chosen by the auth layer.
//!
//! Database errors are logged server-side and returned as a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authorization pipeline failure.
///
/// Status mapping:
/// - MissingHeader, InvalidHeader, UnknownKey, InvalidClaims, Forbidden: 401
/// - MalformedHeader, MalformedToken: 400
/// - ExpiredToken: 403
/// - KeySetUnavailable: 503
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingHeader,

    #[error("{0}")]
    MalformedHeader(String),

    #[error("{0}")]
    InvalidHeader(String),

    #[error("Unable to find the appropriate signing key")]
    UnknownKey,

    #[error("Signing keys are currently unavailable")]
    KeySetUnavailable,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Claims error: check the audience and issuer")]
    InvalidClaims,

    #[error("Malformed token: permissions not specified")]
    MalformedToken,

    #[error("Missing permission")]
    Forbidden,
}

impl AuthError {
    /// HTTP status code for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::InvalidHeader(_)
            | AuthError::UnknownKey
            | AuthError::InvalidClaims
            | AuthError::Forbidden => StatusCode::UNAUTHORIZED,
            AuthError::MalformedHeader(_) | AuthError::MalformedToken => StatusCode::BAD_REQUEST,
            AuthError::ExpiredToken => StatusCode::FORBIDDEN,
            AuthError::KeySetUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error code returned to clients and used as a metric label.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader(_) | AuthError::InvalidHeader(_) => "invalid_header",
            AuthError::UnknownKey => "unknown_key",
            AuthError::KeySetUnavailable => "jwks_unavailable",
            AuthError::ExpiredToken => "token_expired",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::MalformedToken => "malformed_token",
            AuthError::Forbidden => "forbidden",
        }
    }
}

/// Drinks service error type.
///
/// Maps to HTTP status codes:
/// - Auth: whatever the wrapped [`AuthError`] says
/// - NotFound: 404
/// - Conflict: 409
/// - Unprocessable: 422
/// - Database, Internal: 500
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Database(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            ApiError::Auth(err) => (err.code(), err.to_string()),
            ApiError::NotFound(resource) => ("not_found", resource.clone()),
            ApiError::Conflict(reason) => ("conflict", reason.clone()),
            ApiError::Unprocessable(reason) => ("unprocessable", reason.clone()),
            ApiError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "drinks.database", error = %err, "Database operation failed");
                (
                    "database_error",
                    "An internal database error occurred".to_string(),
                )
            }
            ApiError::Internal => ("internal_error", "An internal error occurred".to_string()),
        };

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            code,
            message,
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"drinks-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::Conflict("A drink with that title already exists".to_string());
            }
        }
        ApiError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!(target: "drinks.repository", error = %err, "Stored recipe is not valid JSON");
        ApiError::Internal
    }
}
