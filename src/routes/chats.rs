use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::ChatKind;
use crate::services::ChatService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub other_id: Uuid,
    #[serde(default)]
    pub kind: Option<ChatKind>,
}

/// Create the chat for the caller and `other_id`, or return the existing
/// one. 201 on creation, 200 with `already_exists` when the pair already
/// has a channel.
#[post("/chats")]
pub async fn create_chat(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateChatRequest>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    let kind = request.kind.unwrap_or(ChatKind::PairedProfessional);

    let (chat, created) = ChatService::create_or_get(
        &state.db,
        &state.relationships,
        user.id,
        request.other_id,
        kind,
    )
    .await?;

    let mut response = if created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(response.json(serde_json::json!({
        "chat": chat,
        "already_exists": !created,
    })))
}

#[get("/chats")]
pub async fn list_chats(state: web::Data<AppState>, user: AuthUser) -> AppResult<HttpResponse> {
    let chats = ChatService::list_for_user(&state.db, &state.profiles, user.id).await?;
    Ok(HttpResponse::Ok().json(chats))
}

#[derive(Debug, Deserialize)]
pub struct ExistsQuery {
    pub user_id: Uuid,
}

/// Existence check for the (caller, user_id) pair; no side effects.
#[get("/chats/exists")]
pub async fn chat_exists(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ExistsQuery>,
) -> AppResult<HttpResponse> {
    let exists = ChatService::exists(&state.db, user.id, query.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "exists": exists })))
}
