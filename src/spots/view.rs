use axum::{debug_handler, extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{Spot, SpotKind},
    session::Identity,
    AppResult,
};

use super::{filter::SpotFilter, gate, repo};

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    kind: SpotKind,
    category: Option<String>,
    q: Option<String>,
    tags: Option<String>,
}

/// Kind and category narrow the query in SQL; search text and tag subsets
/// are applied over the fetched list.
#[debug_handler]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Query(ListQuery { kind, category, q, tags }): Query<ListQuery>,
) -> AppResult<Json<Vec<Spot>>> {
    let spots = repo::list_spots(&db_pool, kind, category.as_deref()).await?;

    let filter = SpotFilter {
        q,
        tags: tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect(),
    };

    Ok(Json(filter.apply(spots)))
}

#[derive(Serialize)]
pub(crate) struct SpotDetail {
    #[serde(flatten)]
    spot: Spot,
    member_count: i64,
    member: bool,
    owner: bool,
}

/// Public descriptive fields are visible to anyone, signed in or not.
#[debug_handler]
pub(crate) async fn detail(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    Identity(user_id): Identity,
) -> AppResult<Json<SpotDetail>> {
    let id = id.to_string();
    let spot = repo::get_spot(&db_pool, &id).await?;
    let verdict = gate::verdict(&db_pool, &spot, user_id.as_deref()).await?;
    let member_count = repo::member_count(&db_pool, &id).await?;

    Ok(Json(SpotDetail {
        spot,
        member_count,
        member: verdict.member,
        owner: verdict.owner,
    }))
}
