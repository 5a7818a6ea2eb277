/// Task model and database operations
///
/// Tasks belong to exactly one project and are optionally assigned to a user.
/// Their state moves freely between the three values of [`TaskState`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_state AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     state task_state NOT NULL DEFAULT 'pending',
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use colabora_shared::models::task::{CreateTask, Task, TaskFilter, TaskState};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Write copy".to_string(),
///     description: None,
///     project_id,
///     assignee_id: Some(user_id),
/// }).await?;
///
/// Task::update_state(&pool, task.id, TaskState::InProgress).await?;
///
/// let filter = TaskFilter { state: Some(TaskState::InProgress), ..Default::default() };
/// let visible = Task::list_visible(&pool, user_id, &filter, 10, 0).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task progress state
///
/// Stored as `pending | in_progress | completed`, exchanged over the API as
/// `pending | in-progress | completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_state", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Not started (default)
    #[default]
    Pending,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl TaskState {
    /// All valid states, in workflow order
    pub const ALL: [TaskState; 3] = [TaskState::Pending, TaskState::InProgress, TaskState::Completed];

    /// Converts state to its API string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::InProgress => "in-progress",
            TaskState::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskState::Pending),
            "in-progress" => Ok(TaskState::InProgress),
            "completed" => Ok(TaskState::Completed),
            other => Err(format!(
                "Invalid state '{}', expected one of: pending, in-progress, completed",
                other
            )),
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Current state
    pub state: TaskState,

    /// Owning project
    pub project_id: Uuid,

    /// Assigned user, if any
    pub assignee_id: Option<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
}

/// Optional filters for task listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub state: Option<TaskState>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

const TASK_COLUMNS: &str =
    "t.id, t.title, t.description, t.state, t.project_id, t.assignee_id, t.created_at, t.updated_at";

/// Appends the visibility condition and the optional filters to a query
///
/// A task is visible to a user who created or collaborates on its project.
fn push_visible_where(builder: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &TaskFilter) {
    builder
        .push(" WHERE t.project_id IN (SELECT p.id FROM projects p WHERE p.creator_id = ")
        .push_bind(user_id)
        .push(" UNION SELECT pm.project_id FROM project_members pm WHERE pm.user_id = ")
        .push_bind(user_id)
        .push(")");

    if let Some(state) = filter.state {
        builder.push(" AND t.state = ").push_bind(state);
    }

    if let Some(project_id) = filter.project_id {
        builder.push(" AND t.project_id = ").push_bind(project_id);
    }

    if let Some(assignee_id) = filter.assignee_id {
        builder.push(" AND t.assignee_id = ").push_bind(assignee_id);
    }
}

impl Task {
    /// Creates a task
    ///
    /// Accepts any executor so it can share a transaction with the task's
    /// file rows.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, project_id, assignee_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, state, project_id, assignee_id,
                      created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.project_id)
        .bind(data.assignee_id)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, state, project_id, assignee_id,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks visible to a user, newest first
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(TASK_COLUMNS).push(" FROM tasks t");
        push_visible_where(&mut builder, user_id, filter);
        builder
            .push(" ORDER BY t.created_at DESC, t.id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let tasks = builder.build_query_as::<Task>().fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Counts tasks visible to a user under the same filters as [`Task::list_visible`]
    pub async fn count_visible(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        push_visible_where(&mut builder, user_id, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;

        Ok(count)
    }

    /// Sets the state of a task
    ///
    /// Returns `None` if the task no longer exists.
    pub async fn update_state(
        pool: &PgPool,
        id: Uuid,
        state: TaskState,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET state = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, state, project_id, assignee_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(state)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }
}
