//! Chat lifecycle: creation behind the relationship gate, deduplication on
//! the canonical participant pair, listing and participant checks.

use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde::Serialize;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{canonical_pair, Chat, ChatKind};
use crate::services::profile_client::{ProfileClient, PublicProfile};
use crate::services::relationship_client::RelationshipClient;

const CHAT_COLUMNS: &str = "id, participant_a, participant_b, kind, created_at, updated_at";

fn chat_from_row(row: &Row) -> AppResult<Chat> {
    let kind_str: String = row.get("kind");
    let kind = ChatKind::from_db(&kind_str)
        .ok_or_else(|| AppError::Database(format!("invalid chat kind: {kind_str}")))?;

    Ok(Chat {
        id: row.get("id"),
        participant_a: row.get("participant_a"),
        participant_b: row.get("participant_b"),
        kind,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Listing entry: the chat plus the counterpart's public identity.
#[derive(Debug, Serialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub kind: ChatKind,
    pub counterpart: PublicProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ChatService;

impl ChatService {
    /// Create the chat for an unordered pair, or return the existing one.
    ///
    /// The relationship gate runs before any lookup or write: an absent
    /// relationship is `Forbidden`, an unavailable verifier propagates as
    /// `ServiceUnavailable` (retryable), and neither path writes a row.
    pub async fn create_or_get(
        db: &Pool,
        relationships: &RelationshipClient,
        requester_id: Uuid,
        other_id: Uuid,
        kind: ChatKind,
    ) -> AppResult<(Chat, bool)> {
        if requester_id == other_id {
            return Err(AppError::Validation(
                "cannot open a chat with yourself".into(),
            ));
        }

        if !relationships.verify(requester_id, other_id).await? {
            return Err(AppError::Forbidden);
        }

        let (participant_a, participant_b) = canonical_pair(requester_id, other_id);
        let client = db.get().await?;

        let select = format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE participant_a = $1 AND participant_b = $2"
        );
        if let Some(row) = client
            .query_opt(&select, &[&participant_a, &participant_b])
            .await?
        {
            return Ok((chat_from_row(&row)?, false));
        }

        let id = Uuid::new_v4();
        let kind_db = kind.as_db();
        let insert = format!(
            "INSERT INTO chats (id, participant_a, participant_b, kind) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (participant_a, participant_b) DO NOTHING \
             RETURNING {CHAT_COLUMNS}"
        );
        let inserted = client
            .query_opt(&insert, &[&id, &participant_a, &participant_b, &kind_db])
            .await?;

        match inserted {
            Some(row) => {
                let chat = chat_from_row(&row)?;
                tracing::info!(chat_id = %chat.id, "chat created");
                Ok((chat, true))
            }
            // Lost a creation race; the row that won is the canonical one.
            None => {
                let row = client
                    .query_one(&select, &[&participant_a, &participant_b])
                    .await?;
                Ok((chat_from_row(&row)?, false))
            }
        }
    }

    /// All chats the user participates in, most recently active first, each
    /// enriched with the counterpart's public identity. Enrichment failures
    /// degrade to a placeholder inside `ProfileClient` and never abort the
    /// list.
    pub async fn list_for_user(
        db: &Pool,
        profiles: &ProfileClient,
        user_id: Uuid,
    ) -> AppResult<Vec<ChatSummary>> {
        let client = db.get().await?;
        let query = format!(
            "SELECT {CHAT_COLUMNS} FROM chats \
             WHERE participant_a = $1 OR participant_b = $1 \
             ORDER BY updated_at DESC"
        );
        let rows = client.query(&query, &[&user_id]).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let chat = chat_from_row(&row)?;
            let Some(counterpart_id) = chat.counterpart_of(user_id) else {
                continue;
            };
            let counterpart = profiles.public_profile(counterpart_id).await;
            out.push(ChatSummary {
                id: chat.id,
                kind: chat.kind,
                counterpart,
                created_at: chat.created_at,
                updated_at: chat.updated_at,
            });
        }
        Ok(out)
    }

    /// Pure existence check for a pair, no side effects.
    pub async fn exists(db: &Pool, user_a: Uuid, user_b: Uuid) -> AppResult<bool> {
        let (participant_a, participant_b) = canonical_pair(user_a, user_b);
        let client = db.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM chats WHERE participant_a = $1 AND participant_b = $2)",
                &[&participant_a, &participant_b],
            )
            .await?;
        Ok(row.get(0))
    }

    pub async fn get(db: &Pool, chat_id: Uuid) -> AppResult<Chat> {
        let client = db.get().await?;
        let query = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1");
        let row = client
            .query_opt(&query, &[&chat_id])
            .await?
            .ok_or(AppError::NotFound)?;
        chat_from_row(&row)
    }

    /// Load the chat and check the user is one of its two participants.
    /// Membership is re-checked at every operation that needs it; it is
    /// never trusted from an earlier step of the connection's life.
    pub async fn require_participant(db: &Pool, chat_id: Uuid, user_id: Uuid) -> AppResult<Chat> {
        let chat = Self::get(db, chat_id).await?;
        if !chat.is_participant(user_id) {
            return Err(AppError::Forbidden);
        }
        Ok(chat)
    }
}
