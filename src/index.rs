use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{db::Spot, session::RequireUser, spots::repo, AppResult};

#[derive(Serialize)]
pub struct MySpots {
    pub owned: Vec<Spot>,
    pub joined: Vec<Spot>,
}

/// The signed-in user's spots: ones they own, and ones they joined but don't
/// own. Newest first on both sides.
#[debug_handler]
pub async fn my_spots(
    State(db_pool): State<SqlitePool>,
    RequireUser(user_id): RequireUser,
) -> AppResult<Json<MySpots>> {
    let (owned, joined) = repo::spots_of_user(&db_pool, &user_id).await?;
    Ok(Json(MySpots { owned, joined }))
}
