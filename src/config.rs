use chrono::{Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Shared secret for billing webhook signatures. Without it every
    /// webhook event is rejected.
    pub billing_webhook_secret: Option<String>,
    /// Age after which demo users are deleted, from `DEMO_USER_TTL_HOURS`.
    pub demo_user_ttl: Duration,
    pub demo_cleanup_interval_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let billing_webhook_secret = env_map
            .get("BILLING_WEBHOOK_SECRET")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let demo_user_ttl = env_map
            .get("DEMO_USER_TTL_HOURS")
            .map(|s| s.as_str())
            .unwrap_or("24")
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .and_then(Duration::try_hours)
            .filter(|ttl| Utc::now().checked_sub_signed(*ttl).is_some())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEMO_USER_TTL_HOURS".to_string(),
                    "must be a positive number of hours within range".to_string(),
                )
            })?;

        let demo_cleanup_interval_secs = env_map
            .get("DEMO_CLEANUP_INTERVAL_SECS")
            .map(|s| s.as_str())
            .unwrap_or("3600")
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEMO_CLEANUP_INTERVAL_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            billing_webhook_secret,
            demo_user_ttl,
            demo_cleanup_interval_secs,
        })
    }
}
