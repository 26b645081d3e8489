use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db::Spot, notify::ChangeHub, session::RequireUser, AppResult, AppState};

use super::repo::{self, SpotDraft, SpotPatch};

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    State(changes): State<ChangeHub>,
    RequireUser(user_id): RequireUser,
    Json(draft): Json<SpotDraft>,
) -> AppResult<Json<Spot>> {
    let spot = repo::create_spot(&db_pool, &changes, &user_id, draft).await?;
    Ok(Json(spot))
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(changes): State<ChangeHub>,
    RequireUser(user_id): RequireUser,
    Json(patch): Json<SpotPatch>,
) -> AppResult<Json<Spot>> {
    let spot = repo::update_spot(&db_pool, &changes, &user_id, &id.to_string(), patch).await?;
    Ok(Json(spot))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(changes): State<ChangeHub>,
    RequireUser(user_id): RequireUser,
) -> AppResult<()> {
    repo::delete_spot(&db_pool, &changes, &user_id, &id.to_string()).await
}
