//! Investment operations for the repository.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::store::{InvestmentStore, StoreError};
use crate::domain::{
    CreateInvestmentUpdateCommand, InvestmentId, InvestmentRecord, InvestmentType, NewInvestment,
    UpdateRecord, UserId,
};

use super::updates::insert_update_row;
use super::{ms_to_utc, now_ms, parse_column, Repository};

const INVESTMENT_COLUMNS: &str = "seq, id, type, name, user_id, locked, created_at";

fn investment_from_row(row: &SqliteRow) -> Result<InvestmentRecord, StoreError> {
    Ok(InvestmentRecord {
        id: parse_column::<InvestmentId>("id", row.get::<&str, _>("id"))?,
        investment_type: parse_column::<InvestmentType>("type", row.get::<&str, _>("type"))?,
        name: row.get("name"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        locked: row.get::<i32, _>("locked") != 0,
        created_at: ms_to_utc("created_at", row.get::<i64, _>("created_at"))?,
        seq: row.get::<i64, _>("seq"),
    })
}

#[async_trait]
impl InvestmentStore for Repository {
    async fn find_investment_by_id(
        &self,
        id: InvestmentId,
    ) -> Result<Option<InvestmentRecord>, StoreError> {
        let sql = format!("SELECT {} FROM investment WHERE id = ?", INVESTMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(investment_from_row).transpose()
    }

    async fn find_investments_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<InvestmentRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM investment
            WHERE user_id = ?
            ORDER BY created_at ASC, seq ASC
            "#,
            INVESTMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(investment_from_row).collect()
    }

    async fn insert_investment_with_updates(
        &self,
        investment: &NewInvestment,
        updates: &[CreateInvestmentUpdateCommand],
    ) -> Result<(InvestmentRecord, Vec<UpdateRecord>), StoreError> {
        let created_at_ms = investment.created_at.timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO investment (id, type, name, user_id, locked, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(investment.id.to_string())
        .bind(investment.investment_type.as_str())
        .bind(&investment.name)
        .bind(investment.user_id.as_str())
        .bind(investment.locked as i32)
        .bind(created_at_ms)
        .bind(created_at_ms)
        .execute(&mut *tx)
        .await?;
        let seq = result.last_insert_rowid();

        let mut records = Vec::with_capacity(updates.len());
        for command in updates {
            if command.investment_id != investment.id {
                return Err(StoreError::Constraint(format!(
                    "update for {} inserted with investment {}",
                    command.investment_id, investment.id
                )));
            }
            records.push(insert_update_row(&mut tx, command).await?);
        }
        tx.commit().await?;

        let record = InvestmentRecord {
            id: investment.id,
            investment_type: investment.investment_type,
            name: investment.name.clone(),
            user_id: investment.user_id.clone(),
            locked: investment.locked,
            // Stored at millisecond precision.
            created_at: ms_to_utc("created_at", created_at_ms)?,
            seq,
        };
        Ok((record, records))
    }

    async fn delete_investment_by_id(&self, id: InvestmentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM investment WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_investment_locked(
        &self,
        id: InvestmentId,
        locked: bool,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE investment SET locked = ?, updated_at = ? WHERE id = ?")
            .bind(locked as i32)
            .bind(now_ms())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
