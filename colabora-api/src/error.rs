/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`, which converts to the matching
/// status code and a JSON body of the form:
///
/// ```json
/// {
///   "error": "validation_error",
///   "message": "Request validation failed",
///   "details": [{ "field": "email", "message": "Invalid email format" }]
/// }
/// ```
///
/// Internal errors are always logged. Their message is only sent to the
/// client outside production, see [`set_production_mode`].
///
/// # Example
///
/// ```
/// use colabora_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Project not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use colabora_shared::auth::{
    authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::storage::StorageError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

static PRODUCTION: AtomicBool = AtomicBool::new(false);

/// Hides internal error messages from clients when enabled
///
/// Called once at startup from the configured environment.
pub fn set_production_mode(enabled: bool) {
    PRODUCTION.store(enabled, Ordering::Relaxed);
}

fn production_mode() -> bool {
    PRODUCTION.load(Ordering::Relaxed)
}

const GENERIC_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Validation errors with per-field detail (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. inviting an existing collaborator
    Conflict(String),

    /// Payload too large (413)
    PayloadTooLarge(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Validation errors, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Shorthand for a single-field validation error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self, production: bool) -> ErrorResponse {
        let (code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::PayloadTooLarge(msg) => ("payload_too_large", msg, None),
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                let message = if production {
                    GENERIC_INTERNAL_MESSAGE.to_string()
                } else {
                    msg
                };
                ("internal_error", message, None)
            }
        };

        ErrorResponse {
            error: code.to_string(),
            message,
            details,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.into_body(production_mode());

        (status, Json(body)).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return match db_err.constraint() {
                        Some("users_email_key") => {
                            ApiError::field("email", "Email is already registered")
                        }
                        Some("project_members_pkey") => {
                            ApiError::Conflict("User is already a collaborator".to_string())
                        }
                        _ => ApiError::Conflict("Resource already exists".to_string()),
                    };
                }

                if db_err.is_foreign_key_violation() {
                    return ApiError::NotFound("Referenced resource does not exist".to_string());
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Flattens `validator` errors into one detail per failed rule, sorted by field
pub fn validation_details(errors: &validator::ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field)),
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));

    details
}

/// Convert `validator` errors to field-level details
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(validation_details(&errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

/// Convert authentication errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing authorization token".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::Unauthorized(msg),
            AuthError::InvalidToken(jwt_err) => jwt_err.into(),
            AuthError::UnknownUser => ApiError::Unauthorized("User no longer exists".to_string()),
            AuthError::DatabaseError(err) => err.into(),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::DatabaseError(err) => err.into(),
            other => ApiError::Forbidden(other.to_string()),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::InvalidLifetime(_) => ApiError::InternalError(err.to_string()),
            JwtError::ValidationError(_) => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

/// Convert storage errors to API errors
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::InternalError(format!("File storage failed: {}", err))
    }
}
