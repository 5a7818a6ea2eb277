/// Real-time notifications
///
/// Connected clients receive events through rooms:
///
/// - `user_<id>`: personal room, joined automatically on connect
/// - `project_<id>`: joined on request by collaborators of the project
///
/// HTTP handlers publish through [`RealtimeHub`] after a successful write;
/// the WebSocket endpoint in `routes::ws` subscribes sessions to rooms.

pub mod events;
pub mod hub;

pub use events::{ClientFrame, ServerEvent};
pub use hub::{RealtimeHub, Room};
