//! Settings operations for the repository.

use async_trait::async_trait;
use sqlx::Row;

use crate::db::store::{SettingsStore, StoreError};
use crate::domain::{Currency, Settings, UserId};

use super::{now_ms, parse_column, Repository};

#[async_trait]
impl SettingsStore for Repository {
    async fn find_settings_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Settings>, StoreError> {
        let row = sqlx::query("SELECT currency FROM settings WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let currency =
                    parse_column::<Currency>("currency", row.get::<&str, _>("currency"))?;
                Ok(Some(Settings::new(user_id.clone(), currency)))
            }
            None => Ok(None),
        }
    }

    async fn upsert_settings(&self, settings: &Settings) -> Result<Settings, StoreError> {
        let now = now_ms();
        sqlx::query(
            r#"
            INSERT INTO settings (user_id, currency, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                currency = excluded.currency,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.user_id.as_str())
        .bind(settings.currency.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(settings.clone())
    }

    async fn delete_settings_by_user_id(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM settings WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
