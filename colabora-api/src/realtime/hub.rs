/// Room-based broadcast hub
///
/// Each room owns a `tokio::sync::broadcast` channel, created the first time
/// someone subscribes or publishes. Publishing into a room nobody listens to
/// is not an error; the event is simply dropped.
///
/// # Example
///
/// ```
/// use colabora_api::realtime::{RealtimeHub, Room, ServerEvent};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let hub = RealtimeHub::new();
/// let project = Room::Project(Uuid::new_v4());
///
/// let mut rx = hub.subscribe(project).await;
/// let delivered = hub.emit(project, ServerEvent::new("ping", serde_json::json!({}))).await;
/// assert_eq!(delivered, 1);
/// assert_eq!(rx.recv().await.unwrap().event, "ping");
/// # }
/// ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use super::events::ServerEvent;

/// Buffered events per room before slow receivers start lagging
pub const ROOM_CAPACITY: usize = 256;

/// A pub/sub scope for events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Personal room of one user
    User(Uuid),

    /// Room of one project's collaborators
    Project(Uuid),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user_{}", id),
            Room::Project(id) => write!(f, "project_{}", id),
        }
    }
}

/// Shared registry of room channels
///
/// Cheap to clone; all clones share the same rooms.
#[derive(Debug, Clone, Default)]
pub struct RealtimeHub {
    rooms: Arc<Mutex<HashMap<Room, broadcast::Sender<ServerEvent>>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a room, creating its channel if needed
    pub async fn subscribe(&self, room: Room) -> broadcast::Receiver<ServerEvent> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Publishes an event into a room
    ///
    /// Returns the number of receivers the event was delivered to.
    pub async fn emit(&self, room: Room, event: ServerEvent) -> usize {
        let rooms = self.rooms.lock().await;
        let Some(sender) = rooms.get(&room) else {
            tracing::debug!(room = %room, event = %event.event, "No listeners for event");
            return 0;
        };

        match sender.send(event) {
            Ok(delivered) => {
                tracing::debug!(room = %room, delivered, "Event broadcast");
                delivered
            }
            Err(e) => {
                tracing::debug!(room = %room, event = %e.0.event, "No listeners for event");
                0
            }
        }
    }

    /// Number of live receivers in a room
    pub async fn listeners(&self, room: Room) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.get(&room).map(|s| s.receiver_count()).unwrap_or(0)
    }

    /// Drops channels that no longer have receivers
    ///
    /// Returns how many rooms were removed.
    pub async fn prune(&self) -> usize {
        let mut rooms = self.rooms.lock().await;
        let before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - rooms.len()
    }
}
