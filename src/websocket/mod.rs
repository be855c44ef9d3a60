use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, Mutex, RwLock};
use uuid::Uuid;

pub mod events;

/// Unique identifier for a live WebSocket connection.
///
/// Assigned when the connection is accepted; rooms track members by it so
/// cleanup on leave/disconnect is precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct RoomMember {
    conn: ConnectionId,
    user_id: Uuid,
    sender: UnboundedSender<String>,
}

#[derive(Default)]
struct RegistryInner {
    // chat id -> connections currently joined to the room
    rooms: HashMap<Uuid, Vec<RoomMember>>,
    // connection -> rooms it joined, for precise disconnect cleanup
    memberships: HashMap<ConnectionId, HashSet<Uuid>>,
}

/// Process-local room membership table.
///
/// All membership mutation and all fan-out iteration go through one write
/// lock, so a broadcast never iterates a set being mutated by a join/leave.
/// Purely a routing table: nothing here is persisted.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    send_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection in a room. Idempotent: a connection already in
    /// the room is left untouched. Returns whether it was newly added.
    pub async fn join(
        &self,
        chat_id: Uuid,
        conn: ConnectionId,
        user_id: Uuid,
        sender: UnboundedSender<String>,
    ) -> bool {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let members = inner.rooms.entry(chat_id).or_default();
        if members.iter().any(|m| m.conn == conn) {
            return false;
        }
        members.push(RoomMember {
            conn,
            user_id,
            sender,
        });
        inner.memberships.entry(conn).or_default().insert(chat_id);

        tracing::debug!(
            %chat_id,
            members = members.len(),
            "connection joined room"
        );
        true
    }

    /// Remove a connection from one room. Idempotent.
    pub async fn leave(&self, chat_id: Uuid, conn: ConnectionId) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if let Some(members) = inner.rooms.get_mut(&chat_id) {
            members.retain(|m| m.conn != conn);
            if members.is_empty() {
                inner.rooms.remove(&chat_id);
            }
        }
        if let Some(rooms) = inner.memberships.get_mut(&conn) {
            rooms.remove(&chat_id);
            if rooms.is_empty() {
                inner.memberships.remove(&conn);
            }
        }
    }

    /// Remove a connection from every room it joined. Called when the
    /// connection closes so no orphaned fan-out entries remain.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let Some(rooms) = inner.memberships.remove(&conn) else {
            return;
        };
        for chat_id in rooms {
            if let Some(members) = inner.rooms.get_mut(&chat_id) {
                members.retain(|m| m.conn != conn);
                if members.is_empty() {
                    inner.rooms.remove(&chat_id);
                }
            }
        }
    }

    pub async fn is_joined(&self, chat_id: Uuid, conn: ConnectionId) -> bool {
        let guard = self.inner.read().await;
        guard
            .rooms
            .get(&chat_id)
            .map(|members| members.iter().any(|m| m.conn == conn))
            .unwrap_or(false)
    }

    /// Deliver a payload to every room member except the originating
    /// connection. Dead senders (closed connections) are purged in passing.
    pub async fn broadcast_except(&self, chat_id: Uuid, origin: ConnectionId, payload: String) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let Some(members) = inner.rooms.get_mut(&chat_id) else {
            return;
        };

        let mut dead: Vec<ConnectionId> = Vec::new();
        for member in members.iter() {
            if member.conn == origin {
                continue;
            }
            if member.sender.send(payload.clone()).is_err() {
                dead.push(member.conn);
            }
        }

        if !dead.is_empty() {
            members.retain(|m| !dead.contains(&m.conn));
            if members.is_empty() {
                inner.rooms.remove(&chat_id);
            }
            for conn in &dead {
                if let Some(rooms) = inner.memberships.get_mut(conn) {
                    rooms.remove(&chat_id);
                    if rooms.is_empty() {
                        inner.memberships.remove(conn);
                    }
                }
            }
            tracing::debug!(%chat_id, purged = dead.len(), "purged dead room members");
        }
    }

    pub async fn room_size(&self, chat_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.rooms.get(&chat_id).map(|m| m.len()).unwrap_or(0)
    }

    /// Per-chat lock serializing persist-then-broadcast, so broadcast order
    /// matches persistence order within a chat. Entries are retained for the
    /// process lifetime: handing two in-flight sends different locks could
    /// reorder a broadcast.
    pub async fn send_lock(&self, chat_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.send_locks.lock().await;
        locks
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
