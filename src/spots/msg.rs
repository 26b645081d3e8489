use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db::ChatMessage, notify::ChangeHub, session::RequireUser, AppResult, AppState};

use super::repo;

#[derive(Deserialize)]
pub(crate) struct SendMessageBody {
    content: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn history(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    RequireUser(user_id): RequireUser,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let messages = repo::messages_of(&db_pool, &user_id, &id.to_string()).await?;
    Ok(Json(messages))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(changes): State<ChangeHub>,
    RequireUser(user_id): RequireUser,
    Json(SendMessageBody { content }): Json<SendMessageBody>,
) -> AppResult<Json<ChatMessage>> {
    let message =
        repo::send_message(&db_pool, &changes, &user_id, &id.to_string(), &content).await?;
    Ok(Json(message))
}
