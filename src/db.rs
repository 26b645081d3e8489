use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::AppResult;

/// Location sentinel for spots that meet online rather than at a place.
pub const ONLINE_LOCATION: &str = "Online";

pub const STUDY_CATEGORIES: &[&str] = &[
    "Math", "Science", "Literature", "History", "Computer Science",
    "Languages", "Arts", "General",
];

pub const RECREATION_CATEGORIES: &[&str] = &[
    "Soccer", "Basketball", "Swimming", "Tennis", "Volleyball",
    "Running", "Cycling", "Gaming", "General",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SpotKind {
    Study,
    Recreation,
}

impl SpotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpotKind::Study => "study",
            SpotKind::Recreation => "recreation",
        }
    }

    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            SpotKind::Study => STUDY_CATEGORIES,
            SpotKind::Recreation => RECREATION_CATEGORIES,
        }
    }
}

impl FromStr for SpotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "study" => Ok(SpotKind::Study),
            "recreation" => Ok(SpotKind::Recreation),
            other => Err(format!("unknown spot kind {other:?}")),
        }
    }
}

impl fmt::Display for SpotKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SpotRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub kind: SpotKind,
    pub capacity: i64,
    pub amenities: String,
    pub created_by: String,
    pub created_at: String,
}

impl SpotRow {
    pub fn into_spot(self) -> Spot {
        Spot {
            id: self.id,
            name: self.name,
            description: self.description,
            location: self.location,
            category: self.category,
            kind: self.kind,
            capacity: self.capacity,
            amenities: serde_json::from_str(&self.amenities).unwrap_or_default(),
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Spot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub kind: SpotKind,
    pub capacity: i64,
    pub amenities: Vec<String>,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Member {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub content: String,
    pub created_at: String,
}

pub async fn connect(url: &str) -> AppResult<SqlitePool> {
    // every pooled connection to :memory: would get its own database
    let max_connections = if url.contains(":memory:") { 1 } else { 16 };

    Ok(SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?)
}

pub async fn migrate(db_pool: &SqlitePool) -> AppResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS spots (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL,
            category TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('study', 'recreation')),
            capacity INTEGER NOT NULL CHECK (capacity >= 2),
            amenities TEXT NOT NULL DEFAULT '[]',
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS spot_members (
            spot_id TEXT NOT NULL REFERENCES spots(id),
            user_id TEXT NOT NULL,
            joined_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            PRIMARY KEY (spot_id, user_id)
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            spot_id TEXT NOT NULL REFERENCES spots(id),
            user_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
    )
    .execute(db_pool)
    .await?;

    Ok(())
}
