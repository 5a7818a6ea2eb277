/// Authorization helpers and permission checks
///
/// Colabora has two independent layers of permissions:
///
/// 1. **Global roles**: `admin` and `member` may write, `guest` is read-only
/// 2. **Project access**: a project is visible and mutable by its creator and
///    by every collaborator; deletion is reserved for the creator or an admin
///
/// Tasks inherit the access rules of their project.
///
/// # Example
///
/// ```no_run
/// use colabora_shared::auth::authorization::{require_project_access, require_role};
/// use colabora_shared::auth::middleware::AuthContext;
/// use colabora_shared::models::{project::Project, user::UserRole};
/// use sqlx::PgPool;
///
/// async fn can_edit(pool: &PgPool, auth: &AuthContext, project: &Project) -> bool {
///     require_role(auth, UserRole::WRITERS).is_ok()
///         && require_project_access(pool, auth, project).await.is_ok()
/// }
/// ```

use sqlx::PgPool;

use super::middleware::AuthContext;
use crate::models::{project::Project, project_member::ProjectMember, user::UserRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller neither created nor collaborates on the project
    #[error("Not a collaborator on this project")]
    NotCollaborator,

    /// Caller's role is not in the allowed set
    #[error("Role '{actual}' is not allowed to perform this action")]
    InsufficientRole { actual: UserRole },

    /// Only the creator or an admin may delete a project
    #[error("Only the project creator or an admin can delete this project")]
    NotCreatorOrAdmin,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks that the caller's global role is in `allowed`
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole { actual: auth.role })
    }
}

/// Whether the caller created or collaborates on the project
pub async fn has_project_access(
    pool: &PgPool,
    auth: &AuthContext,
    project: &Project,
) -> Result<bool, sqlx::Error> {
    if project.creator_id == auth.user_id {
        return Ok(true);
    }

    ProjectMember::is_member(pool, project.id, auth.user_id).await
}

/// Checks that the caller may see and modify the project
pub async fn require_project_access(
    pool: &PgPool,
    auth: &AuthContext,
    project: &Project,
) -> Result<(), AuthzError> {
    if has_project_access(pool, auth, project).await? {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %auth.user_id,
            project_id = %project.id,
            "Project access denied"
        );
        Err(AuthzError::NotCollaborator)
    }
}

/// Checks that the caller may delete the project
pub fn require_project_deletion(auth: &AuthContext, project: &Project) -> Result<(), AuthzError> {
    if project.creator_id == auth.user_id || auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotCreatorOrAdmin)
    }
}
