/// Request authentication
///
/// This module turns a bearer token into an [`AuthContext`]: it pulls the
/// token out of the request, validates it and loads the user it names. The
/// API's JWT layer and its WebSocket handshake both go through
/// [`authenticate`], so the two entry points accept exactly the same tokens.
///
/// # Request Extensions
///
/// After successful authentication the API adds an `AuthContext` to the
/// request extensions. Handlers read it with Axum's `Extension` extractor:
///
/// ```
/// use axum::Extension;
/// use colabora_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {} ({})", auth.name, auth.role)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::{User, UserRole};

/// Authenticated caller, attached to every protected request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Display name, used in notifications
    pub name: String,

    pub email: String,

    /// Global role at the time the request was authenticated
    pub role: UserRole,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<User> for AuthContext {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token was supplied
    #[error("Missing authorization token")]
    MissingCredentials,

    /// Authorization header present but not a bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error(transparent)]
    InvalidToken(#[from] JwtError),

    /// Token names a user that no longer exists
    #[error("User no longer exists")]
    UnknownUser,

    /// Database error while loading the user
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Extracts the bearer token from an `Authorization` header
///
/// # Errors
///
/// - `AuthError::MissingCredentials` if the header is absent or empty
/// - `AuthError::InvalidFormat` if it does not use the `Bearer` scheme
pub fn token_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingCredentials)?;

    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat("Expected Bearer token".to_string()));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// Validates a token and loads the user it was issued to
pub async fn authenticate(pool: &PgPool, secret: &str, token: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_token(token, secret)?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");

    Ok(AuthContext::from(user))
}
