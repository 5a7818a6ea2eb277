/// Wire format of real-time messages
///
/// Every frame is a JSON object `{"event": <name>, "data": <payload>}`, in
/// both directions.
///
/// Server events:
///
/// | Event             | Room                  | Payload                                              |
/// |-------------------|-----------------------|------------------------------------------------------|
/// | `invitation`      | invitee's `user_<id>` | `project_id`, `project_title`, `invited_by`          |
/// | `project_updated` | `project_<id>`        | `id`, `title`, `updated_by`                          |
/// | `project_deleted` | `project_<id>`        | `id`, `title`, `deleted_by`                          |
/// | `task_created`    | `project_<id>`        | `id`, `title`, `project_id`, `created_by`            |
/// | `task_updated`    | `project_<id>`        | `id`, `title`, `previous_state`, `new_state`, `updated_by` |
///
/// Client frames are [`ClientFrame`]; the server answers them with
/// `joined`, `left` or `error`.

use colabora_shared::models::{
    project::Project,
    task::{Task, TaskState},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub const INVITATION: &str = "invitation";
pub const PROJECT_UPDATED: &str = "project_updated";
pub const PROJECT_DELETED: &str = "project_deleted";
pub const TASK_CREATED: &str = "task_created";
pub const TASK_UPDATED: &str = "task_updated";

/// Event pushed to connected clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    /// Event name
    pub event: String,

    /// Event payload
    pub data: Value,
}

impl ServerEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// A user was added to a project
    pub fn invitation(project: &Project, invited_by: &str) -> Self {
        Self::new(
            INVITATION,
            json!({
                "project_id": project.id,
                "project_title": project.title,
                "invited_by": invited_by,
            }),
        )
    }

    pub fn project_updated(project: &Project, updated_by: &str) -> Self {
        Self::new(
            PROJECT_UPDATED,
            json!({ "id": project.id, "title": project.title, "updated_by": updated_by }),
        )
    }

    pub fn project_deleted(project: &Project, deleted_by: &str) -> Self {
        Self::new(
            PROJECT_DELETED,
            json!({ "id": project.id, "title": project.title, "deleted_by": deleted_by }),
        )
    }

    pub fn task_created(task: &Task, created_by: &str) -> Self {
        Self::new(
            TASK_CREATED,
            json!({
                "id": task.id,
                "title": task.title,
                "project_id": task.project_id,
                "created_by": created_by,
            }),
        )
    }

    /// A task moved from `previous` to its current state
    pub fn task_updated(task: &Task, previous: TaskState, updated_by: &str) -> Self {
        Self::new(
            TASK_UPDATED,
            json!({
                "id": task.id,
                "title": task.title,
                "previous_state": previous,
                "new_state": task.state,
                "updated_by": updated_by,
            }),
        )
    }

    /// Acknowledges a room join
    pub fn joined(room: &str) -> Self {
        Self::new("joined", json!({ "room": room }))
    }

    /// Acknowledges a room leave
    pub fn left(room: &str) -> Self {
        Self::new("left", json!({ "room": room }))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", json!({ "message": message.into() }))
    }
}

/// Frame sent by a client over the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a project's room
    JoinProject(Uuid),

    /// Unsubscribe from a project's room
    LeaveProject(Uuid),
}
