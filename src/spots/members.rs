use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::CapacityPolicy,
    db::Member,
    notify::ChangeHub,
    session::RequireUser,
    AppResult, AppState,
};

use super::repo;

#[debug_handler(state = AppState)]
pub(crate) async fn join(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(changes): State<ChangeHub>,
    State(policy): State<CapacityPolicy>,
    RequireUser(user_id): RequireUser,
) -> AppResult<()> {
    repo::join_spot(&db_pool, &changes, policy, &user_id, &id.to_string()).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn leave(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(changes): State<ChangeHub>,
    RequireUser(user_id): RequireUser,
) -> AppResult<()> {
    repo::leave_spot(&db_pool, &changes, &user_id, &id.to_string()).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn roster(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    RequireUser(user_id): RequireUser,
) -> AppResult<Json<Vec<Member>>> {
    let members = repo::members_of(&db_pool, &user_id, &id.to_string()).await?;
    Ok(Json(members))
}
