use std::{fmt::Display, str::FromStr};

use tracing::{info, warn};

/// Whether `capacity` is checked when a user joins a spot. The field is
/// collected at creation either way; `Advisory` matches the historically
/// observed behavior of never refusing a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    Enforced,
    #[default]
    Advisory,
}

impl FromStr for CapacityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enforced" => Ok(CapacityPolicy::Enforced),
            "advisory" => Ok(CapacityPolicy::Advisory),
            other => Err(format!("unknown capacity policy {other:?}")),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub client_secret_path: String,
    pub capacity_policy: CapacityPolicy,
    pub change_buffer: usize,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "8080"),
            database_url: try_load("DATABASE_URL", "sqlite::memory:"),
            client_secret_path: try_load("CLIENT_SECRET_PATH", "client_secret.json"),
            capacity_policy: try_load("CAPACITY_POLICY", "advisory"),
            change_buffer: try_load("CHANGE_BUFFER", "256"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    dotenv::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
