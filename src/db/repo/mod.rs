//! SQLite implementation of the store traits.
//!
//! This module provides the `Repository` struct. Trait implementations are
//! organized across submodules by table:
//! - `investments.rs` - `InvestmentStore`
//! - `updates.rs` - `UpdateStore`
//! - `users.rs` - `UserStore`
//! - `settings.rs` - `SettingsStore`

mod investments;
mod settings;
mod updates;
mod users;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

use super::store::StoreError;

/// SQLite-backed repository.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

// SQLite has a 999 parameter limit; chunk to 500 for safety margin.
const CHUNK_SIZE: usize = 500;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn ms_to_utc(column: &str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("{}: invalid timestamp {}", column, ms)))
}

fn parse_column<T>(column: &str, raw: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    T::from_str(raw).map_err(|e| StoreError::Corrupt(format!("{}: {}", column, e)))
}
