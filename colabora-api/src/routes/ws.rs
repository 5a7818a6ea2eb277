/// WebSocket notifications
///
/// # Endpoint
///
/// ```text
/// GET /ws?token=<jwt>
/// ```
///
/// The token may also be sent as `Authorization: Bearer <jwt>`. The
/// handshake is rejected with `401` before upgrading if it is missing or
/// invalid.
///
/// Once connected the socket is subscribed to the user's personal room.
/// Clients then join project rooms explicitly:
///
/// ```json
/// → {"event": "join_project", "data": "<project uuid>"}
/// ← {"event": "joined", "data": {"room": "project_<uuid>"}}
/// ← {"event": "task_created", "data": {"id": "…", "title": "…", …}}
/// ```
///
/// Joining a project the user does not collaborate on answers with an
/// `error` event and leaves the session open.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::AppQuery,
    realtime::{ClientFrame, Room, ServerEvent},
};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use colabora_shared::{
    auth::{
        authorization::has_project_access,
        middleware::{authenticate, token_from_headers, AuthContext},
    },
    models::project::Project,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamMap,
};

/// Query parameters of the handshake
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

type RoomStreams = StreamMap<Room, BroadcastStream<ServerEvent>>;

/// Authenticates the handshake and upgrades the connection
pub async fn ws_handler(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<WsQuery>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let token = match query.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => token_from_headers(&headers)?,
    };

    let auth = authenticate(&state.db, state.jwt_secret(), token).await?;

    let upgrade = upgrade.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    tracing::debug!(user_id = %auth.user_id, "WebSocket handshake accepted");

    Ok(upgrade.on_upgrade(move |socket| run_session(socket, state, auth)))
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, event = %event.event, "Failed to encode event");
            return Ok(());
        }
    };

    sender.send(Message::Text(text)).await
}

/// Applies a client frame and returns the acknowledgement to send back
async fn handle_frame(
    state: &AppState,
    auth: &AuthContext,
    rooms: &mut RoomStreams,
    text: &str,
) -> ServerEvent {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(_) => return ServerEvent::error("Unrecognized frame"),
    };

    match frame {
        ClientFrame::JoinProject(project_id) => {
            let project = match Project::find_by_id(&state.db, project_id).await {
                Ok(Some(project)) => project,
                Ok(None) => return ServerEvent::error("Project not found"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load project for room join");
                    return ServerEvent::error("Could not join project");
                }
            };

            match has_project_access(&state.db, auth, &project).await {
                Ok(true) => {}
                Ok(false) => return ServerEvent::error("Not a collaborator on this project"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to check project access");
                    return ServerEvent::error("Could not join project");
                }
            }

            let room = Room::Project(project.id);
            let receiver = state.hub.subscribe(room).await;
            rooms.insert(room, BroadcastStream::new(receiver));

            tracing::debug!(user_id = %auth.user_id, room = %room, "Joined room");
            ServerEvent::joined(&room.to_string())
        }
        ClientFrame::LeaveProject(project_id) => {
            let room = Room::Project(project_id);
            rooms.remove(&room);

            tracing::debug!(user_id = %auth.user_id, room = %room, "Left room");
            ServerEvent::left(&room.to_string())
        }
    }
}

/// Runs one connection until the client goes away
///
/// A single task multiplexes the socket and every joined room.
async fn run_session(socket: WebSocket, state: AppState, auth: AuthContext) {
    let (mut sender, mut receiver) = socket.split();

    let personal = Room::User(auth.user_id);
    let mut rooms = RoomStreams::new();
    rooms.insert(personal, BroadcastStream::new(state.hub.subscribe(personal).await));

    tracing::info!(user_id = %auth.user_id, "WebSocket connected");

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_frame(&state, &auth, &mut rooms, &text).await;
                    if send_event(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(user_id = %auth.user_id, error = %e, "WebSocket receive failed");
                    break;
                }
            },
            Some((room, event)) = rooms.next() => match event {
                Ok(event) => {
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %auth.user_id, room = %room, skipped, "Client lagging, events dropped");
                }
            },
        }
    }

    drop(rooms);
    let pruned = state.hub.prune().await;

    tracing::info!(user_id = %auth.user_id, pruned_rooms = pruned, "WebSocket disconnected");
}
