//! End-to-end flow against a real PostgreSQL instance.
//!
//! Run with `TEST_DATABASE_URL` pointing at a disposable database:
//! `TEST_DATABASE_URL=postgres://localhost/care_chat_test cargo test -- --ignored`

use std::time::Duration;

use deadpool_postgres::Pool;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use care_chat_service::db;
use care_chat_service::error::AppError;
use care_chat_service::models::ChatKind;
use care_chat_service::services::{ChatService, MessageService, RelationshipClient};

async fn test_pool() -> Pool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a PostgreSQL instance");
    let pool = db::init_pool(&url).await.expect("create pool");
    db::run_migrations(&pool).await.expect("apply migrations");
    pool
}

/// Stub relationship capability serving a fixed response.
async fn stub_relationship_service(
    response_body: &'static str,
    status_line: &'static str,
) -> RelationshipClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{response_body}",
                    response_body.len(),
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });
    RelationshipClient::new(format!("http://{addr}"), Duration::from_secs(2))
        .expect("relationship client")
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn create_or_get_is_idempotent_across_argument_orders() {
    let pool = test_pool().await;
    let relationships = stub_relationship_service(r#"{"active":true}"#, "200 OK").await;

    let user_1 = Uuid::new_v4();
    let user_2 = Uuid::new_v4();

    let (chat, created) = ChatService::create_or_get(
        &pool,
        &relationships,
        user_1,
        user_2,
        ChatKind::PairedProfessional,
    )
    .await
    .expect("first creation");
    assert!(created);

    let (same_chat, created_again) = ChatService::create_or_get(
        &pool,
        &relationships,
        user_2,
        user_1,
        ChatKind::PairedProfessional,
    )
    .await
    .expect("second call");
    assert!(!created_again, "second call must report an existing chat");
    assert_eq!(chat.id, same_chat.id);

    assert!(ChatService::exists(&pool, user_2, user_1).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn absent_relationship_creates_nothing() {
    let pool = test_pool().await;
    let relationships = stub_relationship_service(r#"{"active":false}"#, "200 OK").await;

    let user_1 = Uuid::new_v4();
    let user_2 = Uuid::new_v4();

    let result = ChatService::create_or_get(
        &pool,
        &relationships,
        user_1,
        user_2,
        ChatKind::PairedProfessional,
    )
    .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
    assert!(!ChatService::exists(&pool, user_1, user_2).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn unavailable_verifier_is_retryable_and_creates_nothing() {
    let pool = test_pool().await;
    let relationships =
        stub_relationship_service(r#"{"error":"upstream"}"#, "500 Internal Server Error").await;

    let user_1 = Uuid::new_v4();
    let user_2 = Uuid::new_v4();

    let result = ChatService::create_or_get(
        &pool,
        &relationships,
        user_1,
        user_2,
        ChatKind::PairedProfessional,
    )
    .await;
    match result {
        Err(err @ AppError::ServiceUnavailable(_)) => assert!(err.is_retryable()),
        other => panic!("expected ServiceUnavailable, got {other:?}"),
    }
    assert!(!ChatService::exists(&pool, user_1, user_2).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn self_chat_is_rejected_before_any_lookup() {
    let pool = test_pool().await;
    // Verifier answering "yes" to everything: the self-chat check must fire first.
    let relationships = stub_relationship_service(r#"{"active":true}"#, "200 OK").await;

    let user = Uuid::new_v4();
    let result =
        ChatService::create_or_get(&pool, &relationships, user, user, ChatKind::General).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn history_preserves_send_order_and_participants() {
    let pool = test_pool().await;
    let relationships = stub_relationship_service(r#"{"active":true}"#, "200 OK").await;

    let user_1 = Uuid::new_v4();
    let user_2 = Uuid::new_v4();
    let (chat, _) = ChatService::create_or_get(
        &pool,
        &relationships,
        user_1,
        user_2,
        ChatKind::PairedProfessional,
    )
    .await
    .expect("create chat");

    for content in ["first", "second", "third"] {
        MessageService::record_message(&pool, chat.id, user_1, content)
            .await
            .expect("record message");
    }

    let history = MessageService::history(&pool, chat.id, user_2)
        .await
        .expect("history");
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);

    let mut previous = None;
    for message in &history {
        assert!(chat.is_participant(message.sender_id));
        if let Some(prev) = previous {
            assert!(message.created_at >= prev, "history must be non-decreasing");
        }
        previous = Some(message.created_at);
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn empty_content_never_reaches_the_store() {
    let pool = test_pool().await;
    let relationships = stub_relationship_service(r#"{"active":true}"#, "200 OK").await;

    let user_1 = Uuid::new_v4();
    let user_2 = Uuid::new_v4();
    let (chat, _) = ChatService::create_or_get(
        &pool,
        &relationships,
        user_1,
        user_2,
        ChatKind::PairedProfessional,
    )
    .await
    .expect("create chat");

    let result = MessageService::record_message(&pool, chat.id, user_1, "   \n ").await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let history = MessageService::history(&pool, chat.id, user_1)
        .await
        .expect("history");
    assert!(history.is_empty());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (TEST_DATABASE_URL)"]
async fn non_participant_cannot_send_or_read() {
    let pool = test_pool().await;
    let relationships = stub_relationship_service(r#"{"active":true}"#, "200 OK").await;

    let user_1 = Uuid::new_v4();
    let user_2 = Uuid::new_v4();
    let outsider = Uuid::new_v4();
    let (chat, _) = ChatService::create_or_get(
        &pool,
        &relationships,
        user_1,
        user_2,
        ChatKind::PairedProfessional,
    )
    .await
    .expect("create chat");

    let send = MessageService::record_message(&pool, chat.id, outsider, "hi").await;
    assert!(matches!(send, Err(AppError::Forbidden)));

    let read = MessageService::history(&pool, chat.id, outsider).await;
    assert!(matches!(read, Err(AppError::Forbidden)));
}
