mod clients;
mod lockin;
mod login;
mod logout;

pub use clients::Clients;

use axum::{routing::get, Router};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}

/// First sign-in creates the profile row; signing in again is a no-op. A
/// provider that hands us no usable name gets a generated one.
pub async fn ensure_profile(
    db_pool: &SqlitePool,
    user_id: &str,
    display_name: Option<&str>,
) -> AppResult<()> {
    let username = "user".to_owned() + &Uuid::now_v7().simple().to_string();
    let display_name = match display_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_owned(),
        _ => random_display_name(),
    };

    let inserted = sqlx::query(
        "INSERT INTO profiles (user_id,username,display_name) VALUES (?,?,?)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(&username)
    .bind(&display_name)
    .execute(db_pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        info!("new profile @{username} ({display_name}) for {user_id}");
    }

    Ok(())
}

fn random_display_name() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Lucky",
    ];

    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Panda", "Phoenix", "Griffin",
        "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).unwrap_or(&"Nameless"),
        nouns.choose(&mut rng).unwrap_or(&"Student"),
    )
}
