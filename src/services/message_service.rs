//! Message persistence: the ordering authority for the broadcast protocol.

use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Message;
use crate::services::chat_service::ChatService;

const MESSAGE_COLUMNS: &str = "id, chat_id, sender_id, content, is_read, created_at";

fn message_from_row(row: &Row) -> Message {
    Message {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

pub struct MessageService;

impl MessageService {
    /// Trim and reject empty content. Runs before any I/O so a rejected
    /// send never touches the store.
    pub fn validate_content(raw: &str) -> AppResult<&str> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "message content cannot be empty".into(),
            ));
        }
        Ok(trimmed)
    }

    /// Persist a message on a validated send. The server assigns id and
    /// timestamp; the chat's `updated_at` is bumped in the same transaction
    /// so recency ordering stays consistent with history.
    pub async fn record_message(
        db: &Pool,
        chat_id: Uuid,
        sender_id: Uuid,
        raw_content: &str,
    ) -> AppResult<Message> {
        let content = Self::validate_content(raw_content)?;
        let chat = ChatService::require_participant(db, chat_id, sender_id).await?;

        let id = Uuid::new_v4();
        let mut client = db.get().await?;
        let tx = client.transaction().await?;

        let insert = format!(
            "INSERT INTO messages (id, chat_id, sender_id, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = tx
            .query_one(&insert, &[&id, &chat.id, &sender_id, &content])
            .await?;

        tx.execute(
            "UPDATE chats SET updated_at = NOW() WHERE id = $1",
            &[&chat.id],
        )
        .await?;

        tx.commit().await?;

        Ok(message_from_row(&row))
    }

    /// Full history for a chat, oldest first. Authorization is the same
    /// participant check as join; the path is independent of any live
    /// socket state.
    pub async fn history(db: &Pool, chat_id: Uuid, requester_id: Uuid) -> AppResult<Vec<Message>> {
        ChatService::require_participant(db, chat_id, requester_id).await?;

        let client = db.get().await?;
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE chat_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = client.query(&query, &[&chat_id]).await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Flag the counterpart's messages as read. Returns the number of
    /// messages flipped.
    pub async fn mark_read(db: &Pool, chat_id: Uuid, reader_id: Uuid) -> AppResult<u64> {
        ChatService::require_participant(db, chat_id, reader_id).await?;

        let client = db.get().await?;
        let updated = client
            .execute(
                "UPDATE messages SET is_read = TRUE \
                 WHERE chat_id = $1 AND sender_id <> $2 AND NOT is_read",
                &[&chat_id, &reader_id],
            )
            .await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_rejected() {
        assert!(matches!(
            MessageService::validate_content(""),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn whitespace_only_content_is_rejected() {
        assert!(matches!(
            MessageService::validate_content("   \n\t  "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn content_is_trimmed() {
        assert_eq!(MessageService::validate_content("  hello  ").unwrap(), "hello");
    }
}
