/// Files attached to tasks
///
/// Only metadata lives in the database; the bytes are written by the API's
/// file storage and served from the returned URL.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_files (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     url VARCHAR(512) NOT NULL,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Attached file metadata
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskFile {
    pub id: Uuid,

    /// Original file name as uploaded
    pub name: String,

    /// Public URL of the stored file
    pub url: String,

    pub task_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for attaching a file to a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskFile {
    pub name: String,
    pub url: String,
    pub task_id: Uuid,
}

impl TaskFile {
    /// Records an attached file
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateTaskFile,
    ) -> Result<Self, sqlx::Error> {
        let file = sqlx::query_as::<_, TaskFile>(
            r#"
            INSERT INTO task_files (name, url, task_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, url, task_id, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.url)
        .bind(data.task_id)
        .fetch_one(executor)
        .await?;

        Ok(file)
    }

    /// Lists the files of one task, in upload order
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let files = sqlx::query_as::<_, TaskFile>(
            r#"
            SELECT id, name, url, task_id, created_at
            FROM task_files
            WHERE task_id = $1
            ORDER BY created_at ASC, id
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(files)
    }

    /// Lists the files of several tasks at once
    pub async fn list_by_tasks(pool: &PgPool, task_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let files = sqlx::query_as::<_, TaskFile>(
            r#"
            SELECT id, name, url, task_id, created_at
            FROM task_files
            WHERE task_id = ANY($1)
            ORDER BY created_at ASC, id
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        Ok(files)
    }
}
