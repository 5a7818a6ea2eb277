/// Project model and database operations
///
/// A project is created by a user who automatically becomes its first
/// collaborator. Deleting a project cascades to its collaborators, its tasks
/// and (through the tasks) their files.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     creator_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use colabora_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, creator_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, CreateProject {
///     title: "Website relaunch".to_string(),
///     description: Some("Q3 marketing site".to_string()),
///     creator_id,
/// }).await?;
///
/// let mine = Project::list_for_user(&pool, creator_id, 10, 0).await?;
/// assert_eq!(mine[0].id, project.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::project_member::ProjectMember;

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project title
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// User who created the project
    pub creator_id: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Minimal public view of a project, embedded in task details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub title: String,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            title: project.title.clone(),
        }
    }
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
}

/// Input for updating a project
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Project {
    /// Creates a project and registers its creator as a collaborator
    ///
    /// Both rows are written in a single transaction.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (title, description, creator_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, creator_id, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.creator_id)
        .fetch_one(&mut *tx)
        .await?;

        ProjectMember::add(&mut *tx, project.id, project.creator_id).await?;

        tx.commit().await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, creator_id, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists projects the user created or collaborates on, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.title, p.description, p.creator_id, p.created_at, p.updated_at
            FROM projects p
            WHERE p.creator_id = $1
               OR EXISTS (
                   SELECT 1 FROM project_members pm
                   WHERE pm.project_id = p.id AND pm.user_id = $1
               )
            ORDER BY p.created_at DESC, p.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Counts projects the user created or collaborates on
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM projects p
            WHERE p.creator_id = $1
               OR EXISTS (
                   SELECT 1 FROM project_members pm
                   WHERE pm.project_id = p.id AND pm.user_id = $1
               )
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Updates title and/or description
    ///
    /// Returns `None` if the project no longer exists.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, creator_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Deletes a project together with its collaborators, tasks and files
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
