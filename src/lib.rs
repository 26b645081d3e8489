pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod index;
pub mod notify;
pub mod profiles;
pub mod session;
pub mod spots;

use axum::extract::FromRef;
use serde_json::Value;
use sqlx::SqlitePool;

pub use appresult::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub changes: notify::ChangeHub,
    pub capacity_policy: config::CapacityPolicy,
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }
}
