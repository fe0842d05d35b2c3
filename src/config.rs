//! Runtime configuration from the environment (after `.env` is loaded).

use crate::store::DEFAULT_TX_ATTEMPTS;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub tx_max_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("BIND_ADDR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let database_url = lookup("DATABASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        AppConfig {
            bind_addr,
            database_url,
            db_max_connections: positive_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            tx_max_attempts: positive_or(&lookup, "TX_MAX_ATTEMPTS", DEFAULT_TX_ATTEMPTS),
        }
    }
}

fn positive_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => value,
        _ => {
            log::warn!("{key}={raw:?} is not a positive integer, using {default}");
            default
        }
    }
}
