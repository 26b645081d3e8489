use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{session::RequireUser, AppResult};

#[derive(Serialize)]
pub(crate) struct ProfilePage {
    user_id: String,
    username: String,
    display_name: String,
}

/// Labels for message authors and roster entries. A user without a profile
/// row resolves to placeholders, never an error.
#[debug_handler]
pub(crate) async fn profile(
    Path(user_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    RequireUser(_): RequireUser,
) -> AppResult<Json<ProfilePage>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT username,display_name FROM profiles WHERE user_id=?")
            .bind(&user_id)
            .fetch_optional(&db_pool)
            .await?;

    let (username, display_name) =
        row.unwrap_or(("unknown".to_owned(), "Unknown User".to_owned()));

    Ok(Json(ProfilePage { user_id, username, display_name }))
}
