/// Project collaboration membership
///
/// Join table linking users to the projects they collaborate on. A project's
/// creator gets a row when the project is created; everyone else gets one
/// when invited.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::user::UserRole;

/// A single collaboration row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A collaborator as shown in project details
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collaborator {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,

    /// When the user joined the project
    pub joined_at: DateTime<Utc>,
}

impl ProjectMember {
    /// Adds a user to a project
    ///
    /// Accepts any executor so it can run inside the transaction that
    /// creates the project.
    ///
    /// # Errors
    ///
    /// Returns a unique violation (`project_members_pkey`) if the user
    /// already collaborates on the project.
    pub async fn add<'e>(
        executor: impl PgExecutor<'e>,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id)
            VALUES ($1, $2)
            RETURNING project_id, user_id, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(member)
    }

    /// Checks whether a user collaborates on a project
    pub async fn is_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM project_members
                WHERE project_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists the collaborators of a project, oldest first
    pub async fn list_collaborators(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<Collaborator>, sqlx::Error> {
        let collaborators = sqlx::query_as::<_, Collaborator>(
            r#"
            SELECT u.id, u.name, u.email, u.role, pm.created_at AS joined_at
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(collaborators)
    }
}
