use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Message row matching the database schema. Immutable once written, apart
/// from the `is_read` flag; doubles as the wire shape for history responses
/// and socket fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
