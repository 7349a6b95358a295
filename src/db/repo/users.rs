//! User operations for the repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::store::{StoreError, UserStore};
use crate::domain::{AccountType, User, UserId};

use super::{ms_to_utc, now_ms, parse_column, Repository};

const USER_COLUMNS: &str =
    "id, email, provider, account_type, billing_customer_id, is_demo, created_at";

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId::new(row.get::<String, _>("id")),
        email: row.get("email"),
        provider: row.get("provider"),
        account_type: parse_column::<AccountType>(
            "account_type",
            row.get::<&str, _>("account_type"),
        )?,
        billing_customer_id: row.get::<Option<String>, _>("billing_customer_id"),
        is_demo: row.get::<i32, _>("is_demo") != 0,
        created_at: ms_to_utc("created_at", row.get::<i64, _>("created_at"))?,
    })
}

impl Repository {
    async fn find_user_where(&self, clause: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, clause);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl UserStore for Repository {
    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.find_user_where("id", id.as_str()).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_billing_customer_id(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<User>, StoreError> {
        self.find_user_where("billing_customer_id", billing_customer_id)
            .await
    }

    async fn find_demo_users_created_before(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM users
            WHERE is_demo = 1 AND created_at < ?
            ORDER BY created_at ASC
            "#,
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(created_before.timestamp_millis())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        let created_at_ms = user.created_at.timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, provider, account_type, billing_customer_id, is_demo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.provider)
        .bind(user.account_type.as_str())
        .bind(&user.billing_customer_id)
        .bind(user.is_demo as i32)
        .bind(created_at_ms)
        .bind(created_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(User {
            created_at: ms_to_utc("created_at", created_at_ms)?,
            ..user.clone()
        })
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, provider = ?, account_type = ?, billing_customer_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.provider)
        .bind(user.account_type.as_str())
        .bind(&user.billing_customer_id)
        .bind(now_ms())
        .bind(user.id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_by_id(&self, id: &UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
