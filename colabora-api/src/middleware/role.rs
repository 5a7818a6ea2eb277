/// Role guard middleware
///
/// Restricts a group of routes to a set of global roles. It must run after
/// the JWT layer, which inserts the [`AuthContext`] it reads.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, routing::post, Router};
/// use colabora_api::middleware::role::require_roles;
/// use colabora_shared::models::user::UserRole;
///
/// async fn create() {}
///
/// let writers: Router = Router::new()
///     .route("/", post(create))
///     .layer(from_fn_with_state(UserRole::WRITERS, require_roles));
/// ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use colabora_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::user::UserRole,
};

use crate::error::ApiError;

/// Rejects callers whose role is not in `allowed`
///
/// - `401` if the request was not authenticated
/// - `403` if the caller's role is not allowed
pub async fn require_roles(
    State(allowed): State<&'static [UserRole]>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    if let Err(e) = require_role(auth, allowed) {
        tracing::debug!(user_id = %auth.user_id, role = %auth.role, "Role not allowed");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
