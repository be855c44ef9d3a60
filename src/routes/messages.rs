use actix_web::{get, post, web, HttpResponse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::MessageService;
use crate::state::AppState;

/// Chat history, oldest first. Available regardless of live socket state;
/// a reconnecting client recovers missed messages here.
#[get("/chats/{chat_id}/messages")]
pub async fn get_history(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let chat_id = path.into_inner();
    let messages = MessageService::history(&state.db, chat_id, user.id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// Flag the counterpart's messages in this chat as read.
#[post("/chats/{chat_id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let chat_id = path.into_inner();
    let updated = MessageService::mark_read(&state.db, chat_id, user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}
