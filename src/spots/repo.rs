use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::CapacityPolicy,
    db::{ChatMessage, Member, Spot, SpotKind, SpotRow, ONLINE_LOCATION},
    notify::{ChangeHub, Op, Table},
    AppError, AppResult,
};

use super::gate;

const SPOT_COLUMNS: &str =
    "id,name,description,location,category,kind,capacity,amenities,created_by,created_at";

pub const MIN_CAPACITY: i64 = 2;
pub const MAX_CAPACITY: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SpotDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_online: bool,
    pub category: String,
    pub kind: SpotKind,
    pub capacity: i64,
    #[serde(default)]
    pub amenities: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpotPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub capacity: Option<i64>,
}

fn check_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Invalid("spot name is required"));
    }
    Ok(())
}

fn check_capacity(capacity: i64) -> AppResult<()> {
    if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
        return Err(AppError::Invalid("capacity must be between 2 and 50"));
    }
    Ok(())
}

fn check_category(kind: SpotKind, category: &str) -> AppResult<()> {
    if !kind.categories().contains(&category) {
        return Err(AppError::Invalid("unknown category for this spot kind"));
    }
    Ok(())
}

/// Inserts the spot and the owner's membership in one transaction: a spot
/// must never land without its owner on the roster, even on a crash between
/// the two writes.
pub async fn create_spot(
    db_pool: &SqlitePool,
    changes: &ChangeHub,
    owner: &str,
    draft: SpotDraft,
) -> AppResult<Spot> {
    check_name(&draft.name)?;
    check_capacity(draft.capacity)?;
    check_category(draft.kind, &draft.category)?;

    let location = if draft.is_online {
        ONLINE_LOCATION.to_owned()
    } else {
        let location = draft.location.trim().to_owned();
        if location.is_empty() {
            return Err(AppError::Invalid("location is required"));
        }
        location
    };

    let id = Uuid::now_v7();

    let mut tx = db_pool.begin().await?;
    sqlx::query(
        "INSERT INTO spots (id,name,description,location,category,kind,capacity,amenities,created_by)
         VALUES (?,?,?,?,?,?,?,?,?)",
    )
    .bind(id.to_string())
    .bind(draft.name.trim())
    .bind(&draft.description)
    .bind(&location)
    .bind(&draft.category)
    .bind(draft.kind.as_str())
    .bind(draft.capacity)
    .bind(serde_json::to_string(&draft.amenities)?)
    .bind(owner)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO spot_members (spot_id,user_id) VALUES (?,?)")
        .bind(id.to_string())
        .bind(owner)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("spot {id} ({}) created by {owner}", draft.name.trim());
    changes.publish(Table::Spots, Op::Insert, Some(id));
    changes.publish(Table::Members, Op::Insert, Some(id));

    get_spot(db_pool, &id.to_string()).await
}

pub async fn get_spot(db_pool: &SqlitePool, id: &str) -> AppResult<Spot> {
    let row = sqlx::query_as::<_, SpotRow>(&format!(
        "SELECT {SPOT_COLUMNS} FROM spots WHERE id=?"
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or(AppError::NotFound("spot"))?;

    Ok(row.into_spot())
}

pub async fn list_spots(
    db_pool: &SqlitePool,
    kind: SpotKind,
    category: Option<&str>,
) -> AppResult<Vec<Spot>> {
    let rows = match category {
        Some(category) => {
            sqlx::query_as::<_, SpotRow>(&format!(
                "SELECT {SPOT_COLUMNS} FROM spots WHERE kind=? AND category=? ORDER BY created_at DESC"
            ))
            .bind(kind.as_str())
            .bind(category)
            .fetch_all(db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, SpotRow>(&format!(
                "SELECT {SPOT_COLUMNS} FROM spots WHERE kind=? ORDER BY created_at DESC"
            ))
            .bind(kind.as_str())
            .fetch_all(db_pool)
            .await?
        }
    };

    Ok(rows.into_iter().map(SpotRow::into_spot).collect())
}

/// Spots the user owns and spots they joined but don't own, newest first.
pub async fn spots_of_user(
    db_pool: &SqlitePool,
    user_id: &str,
) -> AppResult<(Vec<Spot>, Vec<Spot>)> {
    let owned = sqlx::query_as::<_, SpotRow>(&format!(
        "SELECT {SPOT_COLUMNS} FROM spots WHERE created_by=? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let joined = sqlx::query_as::<_, SpotRow>(&format!(
        "SELECT s.{} FROM spots s
         JOIN spot_members sm ON sm.spot_id = s.id
         WHERE sm.user_id=? AND s.created_by != ?
         ORDER BY s.created_at DESC",
        SPOT_COLUMNS.replace(',', ",s."),
    ))
    .bind(user_id)
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    Ok((
        owned.into_iter().map(SpotRow::into_spot).collect(),
        joined.into_iter().map(SpotRow::into_spot).collect(),
    ))
}

pub async fn update_spot(
    db_pool: &SqlitePool,
    changes: &ChangeHub,
    actor: &str,
    id: &str,
    patch: SpotPatch,
) -> AppResult<Spot> {
    let spot = get_spot(db_pool, id).await?;
    if !gate::assess(&spot, Some(actor), false).can_edit() {
        return Err(AppError::Forbidden("only the owner can edit this spot"));
    }

    let name = patch.name.unwrap_or(spot.name);
    let description = patch.description.unwrap_or(spot.description);
    let location = patch.location.unwrap_or(spot.location);
    let category = patch.category.unwrap_or(spot.category);
    let capacity = patch.capacity.unwrap_or(spot.capacity);

    check_name(&name)?;
    check_capacity(capacity)?;
    check_category(spot.kind, &category)?;
    if location.trim().is_empty() {
        return Err(AppError::Invalid("location is required"));
    }

    sqlx::query(
        "UPDATE spots SET name=?, description=?, location=?, category=?, capacity=? WHERE id=?",
    )
    .bind(name.trim())
    .bind(&description)
    .bind(&location)
    .bind(&category)
    .bind(capacity)
    .bind(id)
    .execute(db_pool)
    .await?;

    changes.publish(Table::Spots, Op::Update, Some(Uuid::parse_str(id)?));

    get_spot(db_pool, id).await
}

/// Owner-only. Cascades messages and memberships in the same transaction.
pub async fn delete_spot(
    db_pool: &SqlitePool,
    changes: &ChangeHub,
    actor: &str,
    id: &str,
) -> AppResult<()> {
    let spot = get_spot(db_pool, id).await?;
    if !gate::assess(&spot, Some(actor), false).can_delete() {
        return Err(AppError::Forbidden("only the owner can delete this spot"));
    }

    let mut tx = db_pool.begin().await?;
    sqlx::query("DELETE FROM messages WHERE spot_id=?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM spot_members WHERE spot_id=?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM spots WHERE id=?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("spot {id} deleted by {actor}");
    let spot_id = Some(Uuid::parse_str(id)?);
    changes.publish(Table::Spots, Op::Delete, spot_id);
    changes.publish(Table::Members, Op::Delete, spot_id);
    changes.publish(Table::Messages, Op::Delete, spot_id);

    Ok(())
}

pub async fn member_count(db_pool: &SqlitePool, id: &str) -> AppResult<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM spot_members WHERE spot_id=?")
            .bind(id)
            .fetch_one(db_pool)
            .await?;
    Ok(count)
}

/// Joining twice is a no-op, not an error: the (spot_id, user_id) primary
/// key plus ON CONFLICT DO NOTHING means a duplicate attempt never inserts a
/// second row. Capacity is only checked under `CapacityPolicy::Enforced`.
pub async fn join_spot(
    db_pool: &SqlitePool,
    changes: &ChangeHub,
    policy: CapacityPolicy,
    actor: &str,
    id: &str,
) -> AppResult<()> {
    let spot = get_spot(db_pool, id).await?;

    if policy == CapacityPolicy::Enforced
        && !gate::is_member(db_pool, id, actor).await?
        && member_count(db_pool, id).await? >= spot.capacity
    {
        return Err(AppError::Conflict("spot is full"));
    }

    let inserted = sqlx::query(
        "INSERT INTO spot_members (spot_id,user_id) VALUES (?,?)
         ON CONFLICT (spot_id,user_id) DO NOTHING",
    )
    .bind(id)
    .bind(actor)
    .execute(db_pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        info!("{actor} joined spot {id}");
        changes.publish(Table::Members, Op::Insert, Some(Uuid::parse_str(id)?));
    }

    Ok(())
}

/// Removes exactly the actor's own membership row. The owner has no bare
/// leave; the delete path is how an owner exits.
pub async fn leave_spot(
    db_pool: &SqlitePool,
    changes: &ChangeHub,
    actor: &str,
    id: &str,
) -> AppResult<()> {
    let spot = get_spot(db_pool, id).await?;
    let verdict = gate::verdict(db_pool, &spot, Some(actor)).await?;
    if verdict.owner {
        return Err(AppError::Forbidden("the owner leaves by deleting the spot"));
    }

    let removed = sqlx::query("DELETE FROM spot_members WHERE spot_id=? AND user_id=?")
        .bind(id)
        .bind(actor)
        .execute(db_pool)
        .await?
        .rows_affected();

    if removed > 0 {
        info!("{actor} left spot {id}");
        changes.publish(Table::Members, Op::Delete, Some(Uuid::parse_str(id)?));
    }

    Ok(())
}

/// Roster with display names, members only. One batched LEFT JOIN; a missing
/// profile row degrades to placeholder labels rather than an error.
pub async fn members_of(
    db_pool: &SqlitePool,
    actor: &str,
    id: &str,
) -> AppResult<Vec<Member>> {
    let spot = get_spot(db_pool, id).await?;
    let verdict = gate::verdict(db_pool, &spot, Some(actor)).await?;
    if !verdict.can_chat() {
        return Err(AppError::Forbidden("members only"));
    }

    Ok(sqlx::query_as::<_, Member>(
        "SELECT sm.user_id,
                COALESCE(p.username, 'unknown') AS username,
                COALESCE(p.display_name, 'Unknown User') AS display_name,
                sm.joined_at
         FROM spot_members sm
         LEFT JOIN profiles p ON p.user_id = sm.user_id
         WHERE sm.spot_id=?
         ORDER BY sm.joined_at ASC",
    )
    .bind(id)
    .fetch_all(db_pool)
    .await?)
}

/// History for a member, ascending by (created_at, id); ids are UUIDv7 so the
/// id breaks ties between equal timestamps.
pub async fn messages_of(
    db_pool: &SqlitePool,
    actor: &str,
    id: &str,
) -> AppResult<Vec<ChatMessage>> {
    let spot = get_spot(db_pool, id).await?;
    let verdict = gate::verdict(db_pool, &spot, Some(actor)).await?;
    if !verdict.can_chat() {
        return Err(AppError::Forbidden("members only"));
    }

    Ok(sqlx::query_as::<_, ChatMessage>(
        "SELECT m.id, m.user_id,
                COALESCE(p.username, 'unknown') AS username,
                COALESCE(p.display_name, 'Unknown User') AS display_name,
                m.content, m.created_at
         FROM messages m
         LEFT JOIN profiles p ON p.user_id = m.user_id
         WHERE m.spot_id=?
         ORDER BY m.created_at ASC, m.id ASC",
    )
    .bind(id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn send_message(
    db_pool: &SqlitePool,
    changes: &ChangeHub,
    actor: &str,
    id: &str,
    content: &str,
) -> AppResult<ChatMessage> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Invalid("message is empty"));
    }

    let spot = get_spot(db_pool, id).await?;
    let verdict = gate::verdict(db_pool, &spot, Some(actor)).await?;
    if !verdict.can_chat() {
        return Err(AppError::Forbidden("members only"));
    }

    let message_id = Uuid::now_v7();
    sqlx::query("INSERT INTO messages (id,spot_id,user_id,content) VALUES (?,?,?,?)")
        .bind(message_id.to_string())
        .bind(id)
        .bind(actor)
        .bind(content)
        .execute(db_pool)
        .await?;

    let message = sqlx::query_as::<_, ChatMessage>(
        "SELECT m.id, m.user_id,
                COALESCE(p.username, 'unknown') AS username,
                COALESCE(p.display_name, 'Unknown User') AS display_name,
                m.content, m.created_at
         FROM messages m
         LEFT JOIN profiles p ON p.user_id = m.user_id
         WHERE m.id=?",
    )
    .bind(message_id.to_string())
    .fetch_one(db_pool)
    .await?;

    changes.publish(Table::Messages, Op::Insert, Some(Uuid::parse_str(id)?));

    Ok(message)
}
