/// Task endpoints
///
/// Tasks inherit the access rules of their project: only the project's
/// creator and collaborators can see or change them.
///
/// # Endpoints
///
/// - `POST  /api/tareas` - Create a task, optionally with attachments
/// - `GET   /api/tareas?state&project_id&assignee_id&page&limit` - List visible tasks
/// - `GET   /api/tareas/:id` - Task with assignee, files and project
/// - `PATCH /api/tareas/:id/estado` - Change the task's state
///
/// # Creating tasks
///
/// `POST /api/tareas` accepts either `application/json` or
/// `multipart/form-data`. Multipart requests carry the same text fields
/// (`title`, `description`, `project_id`, `assignee_id`) plus up to
/// `UPLOAD_MAX_FILES` parts named `files`:
///
/// ```text
/// curl -H "Authorization: Bearer $TOKEN" \
///      -F title="Draft roadmap" -F project_id=$PROJECT \
///      -F files=@notes.pdf -F files=@diagram.png \
///      http://localhost:3000/api/tareas
/// ```

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
    extract::{not_blank, AppJson, AppPath, AppQuery},
    realtime::{Room, ServerEvent},
    routes::{parse_uuid, projects::find_accessible_project, PageQuery},
    storage::StoredFile,
};
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    Extension, Json,
};
use bytes::Bytes;
use colabora_shared::{
    auth::middleware::AuthContext,
    models::{
        project::ProjectSummary,
        task::{CreateTask, Task, TaskFilter, TaskState},
        task_file::{CreateTaskFile, TaskFile},
        user::{User, UserSummary},
    },
    pagination::{PageParams, Pagination},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Text fields of a task creation request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "Title is required"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: String,

    pub description: Option<String>,

    /// Project the task belongs to (UUID)
    pub project_id: Option<String>,

    /// Optional assignee (UUID)
    pub assignee_id: Option<String>,
}

/// A file part of a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Bytes,
}

/// Task creation payload, from JSON or multipart
#[derive(Debug, Default)]
pub struct TaskSubmission {
    pub fields: CreateTaskRequest,
    pub files: Vec<UploadedFile>,
}

/// Validated task creation input
#[derive(Debug, Clone, PartialEq, Eq)]
struct NewTask {
    title: String,
    description: Option<String>,
    project_id: Uuid,
    assignee_id: Option<Uuid>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateTaskRequest {
    fn set(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = value,
            "description" => self.description = Some(value),
            "project_id" => self.project_id = Some(value),
            "assignee_id" => self.assignee_id = Some(value),
            _ => {}
        }
    }

    /// Checks every field, reporting all problems at once
    fn into_new_task(self) -> Result<NewTask, ApiError> {
        let mut errors = self
            .validate()
            .err()
            .map(|e| validation_details(&e))
            .unwrap_or_default();

        let project_raw = non_empty(self.project_id);
        if project_raw.is_none() {
            errors.push(ValidationErrorDetail::new("project_id", "Project is required"));
        }
        let project_id = parse_uuid("project_id", project_raw.as_deref(), &mut errors);
        let assignee_id = parse_uuid(
            "assignee_id",
            non_empty(self.assignee_id).as_deref(),
            &mut errors,
        );

        match project_id {
            Some(project_id) if errors.is_empty() => Ok(NewTask {
                title: self.title.trim().to_string(),
                description: non_empty(self.description),
                project_id,
                assignee_id,
            }),
            _ => Err(ApiError::ValidationError(errors)),
        }
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for TaskSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let AppJson(fields) = AppJson::<CreateTaskRequest>::from_request(req, state).await?;
            return Ok(Self {
                fields,
                files: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let mut submission = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "files" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;

                // Browsers send an empty part when no file was picked
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }

                submission.files.push(UploadedFile {
                    name: file_name,
                    bytes,
                });
            } else {
                let value = field.text().await?;
                submission.fields.set(&name, value);
            }
        }

        Ok(submission)
    }
}

/// Task filters as received in the query string
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub state: Option<String>,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,

    #[serde(flatten)]
    pub page: PageQuery,
}

impl TaskListQuery {
    /// Parses the filters; any malformed value is a `400`
    fn filter(&self) -> Result<TaskFilter, ApiError> {
        let mut errors = Vec::new();

        let state = match non_empty(self.state.clone()) {
            Some(raw) => match raw.parse::<TaskState>() {
                Ok(state) => Some(state),
                Err(message) => {
                    errors.push(ValidationErrorDetail::new("state", message));
                    None
                }
            },
            None => None,
        };
        let project_id = parse_uuid(
            "project_id",
            non_empty(self.project_id.clone()).as_deref(),
            &mut errors,
        );
        let assignee_id = parse_uuid(
            "assignee_id",
            non_empty(self.assignee_id.clone()).as_deref(),
            &mut errors,
        );

        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors));
        }

        Ok(TaskFilter {
            state,
            project_id,
            assignee_id,
        })
    }
}

/// State change request
#[derive(Debug, Deserialize)]
pub struct UpdateStateRequest {
    pub state: Option<String>,
}

/// Task with its related records
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,

    pub assignee: Option<UserSummary>,
    pub files: Vec<TaskFile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSummary>,
}

/// Page of tasks
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskDetail>,
    pub pagination: Pagination,
}

/// Writes the task and its file rows in one transaction
async fn insert_task(
    state: &AppState,
    data: CreateTask,
    stored: &[StoredFile],
) -> Result<(Task, Vec<TaskFile>), sqlx::Error> {
    let mut tx = state.db.begin().await?;

    let task = Task::create(&mut *tx, data).await?;

    let mut files = Vec::with_capacity(stored.len());
    for file in stored {
        let row = TaskFile::create(
            &mut *tx,
            CreateTaskFile {
                name: file.original_name.clone(),
                url: file.url.clone(),
                task_id: task.id,
            },
        )
        .await?;
        files.push(row);
    }

    tx.commit().await?;

    Ok((task, files))
}

async fn discard_files(state: &AppState, stored: &[StoredFile]) {
    for file in stored {
        if let Err(e) = state.storage.remove(file).await {
            tracing::warn!(file = %file.stored_name, error = %e, "Failed to remove orphaned upload");
        }
    }
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields or too many files
/// - `403 Forbidden`: Caller is a guest or not a collaborator on the project
/// - `404 Not Found`: Unknown project or assignee
/// - `413 Payload Too Large`: Upload exceeds `UPLOAD_MAX_BYTES`
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    submission: TaskSubmission,
) -> ApiResult<(StatusCode, Json<TaskDetail>)> {
    let TaskSubmission { fields, files } = submission;
    let input = fields.into_new_task()?;

    let max_files = state.config.uploads.max_files;
    if files.len() > max_files {
        return Err(ApiError::field(
            "files",
            format!("At most {} files can be attached to a task", max_files),
        ));
    }

    let project = find_accessible_project(&state, &auth, input.project_id).await?;

    let assignee = match input.assignee_id {
        Some(id) => Some(
            User::find_by_id(&state.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Assignee not found".to_string()))?,
        ),
        None => None,
    };

    let mut stored = Vec::with_capacity(files.len());
    for file in &files {
        match state.storage.store(&file.name, &file.bytes).await {
            Ok(s) => stored.push(s),
            Err(e) => {
                discard_files(&state, &stored).await;
                return Err(e.into());
            }
        }
    }

    let data = CreateTask {
        title: input.title,
        description: input.description,
        project_id: project.id,
        assignee_id: assignee.as_ref().map(|u| u.id),
    };

    let (task, task_files) = match insert_task(&state, data, &stored).await {
        Ok(created) => created,
        Err(e) => {
            discard_files(&state, &stored).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        task_id = %task.id,
        project_id = %project.id,
        files = task_files.len(),
        user_id = %auth.user_id,
        "Task created"
    );

    state
        .hub
        .emit(
            Room::Project(project.id),
            ServerEvent::task_created(&task, &auth.name),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(TaskDetail {
            task,
            assignee: assignee.as_ref().map(UserSummary::from),
            files: task_files,
            project: Some(ProjectSummary::from(&project)),
        }),
    ))
}

/// List tasks of the projects the caller collaborates on, newest first
///
/// # Errors
///
/// - `400 Bad Request`: Unknown `state` or malformed ID filter
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<TaskListQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let filter = query.filter()?;
    let params: PageParams = query.page.params();

    let total = Task::count_visible(&state.db, auth.user_id, &filter).await?;
    let tasks = Task::list_visible(
        &state.db,
        auth.user_id,
        &filter,
        params.limit,
        params.offset(),
    )
    .await?;

    let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut assignee_ids: Vec<Uuid> = tasks.iter().filter_map(|t| t.assignee_id).collect();
    assignee_ids.sort_unstable();
    assignee_ids.dedup();

    let mut files_by_task: HashMap<Uuid, Vec<TaskFile>> = HashMap::new();
    for file in TaskFile::list_by_tasks(&state.db, &task_ids).await? {
        files_by_task.entry(file.task_id).or_default().push(file);
    }

    let assignees: HashMap<Uuid, UserSummary> = User::summaries(&state.db, &assignee_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let tasks = tasks
        .into_iter()
        .map(|task| TaskDetail {
            assignee: task.assignee_id.and_then(|id| assignees.get(&id).cloned()),
            files: files_by_task.remove(&task.id).unwrap_or_default(),
            project: None,
            task,
        })
        .collect();

    Ok(Json(TaskListResponse {
        tasks,
        pagination: Pagination::new(total, &params),
    }))
}

/// Loads a task and checks the caller may access its project
async fn find_accessible_task(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<(Task, ProjectSummary)> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    let project = find_accessible_project(state, auth, task.project_id).await?;

    Ok((task, ProjectSummary::from(&project)))
}

/// Get a task with its assignee, files and project
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<TaskDetail>> {
    let (task, project) = find_accessible_task(&state, &auth, id).await?;

    let assignee = match task.assignee_id {
        Some(assignee_id) => User::find_by_id(&state.db, assignee_id)
            .await?
            .as_ref()
            .map(UserSummary::from),
        None => None,
    };
    let files = TaskFile::list_by_task(&state.db, task.id).await?;

    Ok(Json(TaskDetail {
        task,
        assignee,
        files,
        project: Some(project),
    }))
}

/// Change a task's state
///
/// # Endpoint
///
/// ```text
/// PATCH /api/tareas/:id/estado
///
/// { "state": "in-progress" }
/// ```
///
/// Notifies the project room with `task_updated`, including the previous
/// state.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or unknown state
/// - `403 Forbidden`: Caller is a guest or not a collaborator
/// - `404 Not Found`: Unknown task
pub async fn update_task_state(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateStateRequest>,
) -> ApiResult<Json<Task>> {
    let new_state = req
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::field("state", "State is required"))?
        .parse::<TaskState>()
        .map_err(|e| ApiError::field("state", e))?;

    let (task, _) = find_accessible_task(&state, &auth, id).await?;
    let previous = task.state;

    let updated = Task::update_state(&state.db, task.id, new_state)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(
        task_id = %updated.id,
        from = %previous,
        to = %updated.state,
        user_id = %auth.user_id,
        "Task state changed"
    );

    state
        .hub
        .emit(
            Room::Project(updated.project_id),
            ServerEvent::task_updated(&updated, previous, &auth.name),
        )
        .await;

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, project_id: Option<&str>, assignee_id: Option<&str>) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: Some("  ".to_string()),
            project_id: project_id.map(str::to_string),
            assignee_id: assignee_id.map(str::to_string),
        }
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::ValidationError(details) => details.into_iter().map(|d| d.field).collect(),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_task_input() {
        let project = Uuid::new_v4();
        let input = request(" Write docs ", Some(&project.to_string()), Some(""))
            .into_new_task()
            .unwrap();

        assert_eq!(input.title, "Write docs");
        assert_eq!(input.description, None);
        assert_eq!(input.project_id, project);
        assert_eq!(input.assignee_id, None);
    }

    #[test]
    fn test_task_input_reports_every_field() {
        let err = request("", None, Some("bob")).into_new_task().unwrap_err();
        let fields = fields(err);

        assert!(fields.contains(&"title".to_string()));
        assert!(fields.contains(&"project_id".to_string()));
        assert!(fields.contains(&"assignee_id".to_string()));
    }

    #[test]
    fn test_malformed_project_id() {
        let err = request("Docs", Some("42"), None).into_new_task().unwrap_err();
        assert_eq!(fields(err), vec!["project_id".to_string()]);
    }

    #[test]
    fn test_multipart_field_names() {
        let mut req = CreateTaskRequest::default();
        req.set("title", "T".to_string());
        req.set("project_id", "p".to_string());
        req.set("unknown", "ignored".to_string());

        assert_eq!(req.title, "T");
        assert_eq!(req.project_id.as_deref(), Some("p"));
        assert!(req.assignee_id.is_none());
    }

    #[test]
    fn test_list_filters() {
        let project = Uuid::new_v4();
        let query = TaskListQuery {
            state: Some("in-progress".to_string()),
            project_id: Some(project.to_string()),
            ..Default::default()
        };

        let filter = query.filter().unwrap();
        assert_eq!(filter.state, Some(TaskState::InProgress));
        assert_eq!(filter.project_id, Some(project));
        assert_eq!(filter.assignee_id, None);
    }

    #[test]
    fn test_invalid_list_filters_are_rejected() {
        let query = TaskListQuery {
            state: Some("archived".to_string()),
            assignee_id: Some("nope".to_string()),
            ..Default::default()
        };

        let fields = fields(query.filter().unwrap_err());
        assert_eq!(fields, vec!["state".to_string(), "assignee_id".to_string()]);
    }

    #[test]
    fn test_empty_filters_are_ignored() {
        let query = TaskListQuery {
            state: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(query.filter().unwrap(), TaskFilter::default());
    }
}
