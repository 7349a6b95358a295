//! Investment update operations for the repository.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use crate::db::store::{StoreError, UpdateStore};
use crate::domain::ordering::sort_records_deterministic;
use crate::domain::{
    format_date, parse_date, CreateInvestmentUpdateCommand, InvestmentId, UpdateId, UpdateRecord,
};

use super::{now_ms, parse_column, Repository, CHUNK_SIZE};

const UPDATE_COLUMNS: &str = "seq, id, investment_id, date, deposit, withdrawal, value";

fn update_from_row(row: &SqliteRow) -> Result<UpdateRecord, StoreError> {
    let date: String = row.get("date");
    let date = parse_date(&date)
        .map_err(|e| StoreError::Corrupt(format!("date: {} ({})", date, e)))?;

    Ok(UpdateRecord {
        id: parse_column::<UpdateId>("id", row.get::<&str, _>("id"))?,
        investment_id: parse_column::<InvestmentId>(
            "investment_id",
            row.get::<&str, _>("investment_id"),
        )?,
        date,
        deposit: row.get::<Option<i64>, _>("deposit"),
        withdrawal: row.get::<Option<i64>, _>("withdrawal"),
        value: row.get::<i64, _>("value"),
        seq: row.get::<i64, _>("seq"),
    })
}

/// Insert one update row on the given connection, so callers can share a transaction.
pub(super) async fn insert_update_row(
    conn: &mut SqliteConnection,
    command: &CreateInvestmentUpdateCommand,
) -> Result<UpdateRecord, StoreError> {
    let id = UpdateId::new_random();
    let result = sqlx::query(
        r#"
        INSERT INTO investment_update (id, investment_id, date, deposit, withdrawal, value, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(command.investment_id.to_string())
    .bind(format_date(command.date))
    .bind(command.deposit)
    .bind(command.withdrawal)
    .bind(command.value)
    .bind(now_ms())
    .execute(&mut *conn)
    .await?;

    Ok(UpdateRecord {
        id,
        investment_id: command.investment_id,
        date: command.date,
        deposit: command.deposit,
        withdrawal: command.withdrawal,
        value: command.value,
        seq: result.last_insert_rowid(),
    })
}

#[async_trait]
impl UpdateStore for Repository {
    async fn find_update_by_id(&self, id: UpdateId) -> Result<Option<UpdateRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM investment_update WHERE id = ?",
            UPDATE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(update_from_row).transpose()
    }

    async fn find_updates(
        &self,
        investment_ids: &[InvestmentId],
        date_from: Option<NaiveDate>,
    ) -> Result<Vec<UpdateRecord>, StoreError> {
        if investment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for chunk in investment_ids.chunks(CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let date_clause = if date_from.is_some() {
                "AND date >= ?"
            } else {
                ""
            };
            let sql = format!(
                r#"
                SELECT {}
                FROM investment_update
                WHERE investment_id IN ({}) {}
                ORDER BY date ASC, seq ASC
                "#,
                UPDATE_COLUMNS, placeholders, date_clause
            );

            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id.to_string());
            }
            if let Some(date_from) = date_from {
                query = query.bind(format_date(date_from));
            }

            let rows = query.fetch_all(&self.pool).await?;
            for row in &rows {
                out.push(update_from_row(row)?);
            }
        }

        // Chunks are ordered individually; restore the global order.
        sort_records_deterministic(&mut out);
        Ok(out)
    }

    async fn find_last_update_at_or_before(
        &self,
        investment_id: InvestmentId,
        date: NaiveDate,
    ) -> Result<Option<UpdateRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM investment_update
            WHERE investment_id = ? AND date <= ?
            ORDER BY date DESC, seq DESC
            LIMIT 1
            "#,
            UPDATE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(investment_id.to_string())
            .bind(format_date(date))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(update_from_row).transpose()
    }

    async fn insert_update(
        &self,
        command: &CreateInvestmentUpdateCommand,
    ) -> Result<UpdateRecord, StoreError> {
        let mut conn = self.pool.acquire().await?;
        insert_update_row(&mut conn, command).await
    }

    async fn insert_updates(
        &self,
        commands: &[CreateInvestmentUpdateCommand],
    ) -> Result<Vec<UpdateRecord>, StoreError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(commands.len());
        for command in commands {
            records.push(insert_update_row(&mut tx, command).await?);
        }
        tx.commit().await?;

        Ok(records)
    }

    async fn delete_update_by_id(&self, id: UpdateId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM investment_update WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_updates_by_investment_id(
        &self,
        investment_id: InvestmentId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM investment_update WHERE investment_id = ?")
            .bind(investment_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
