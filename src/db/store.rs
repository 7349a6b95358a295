//! Storage abstraction consumed by the ledger services.
//!
//! Each method is atomic. Writes that must land together (an investment with
//! its seed update, an imported batch) have a dedicated method that commits
//! all rows or none; the remaining multi-step sequences are composed by the
//! services and are safe to re-run.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use thiserror::Error;

use crate::domain::{
    CreateInvestmentUpdateCommand, InvestmentId, InvestmentRecord, NewInvestment, Settings,
    UpdateId, UpdateRecord, User, UserId,
};

/// Error type for store operations.
///
/// Absence of a row is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    /// A stored row could not be mapped back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    /// A write would break a reference between rows.
    #[error("constraint violated: {0}")]
    Constraint(String),
    /// The store refused the operation (used for failure injection in tests).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Investment rows.
#[async_trait]
pub trait InvestmentStore: Send + Sync + fmt::Debug {
    async fn find_investment_by_id(
        &self,
        id: InvestmentId,
    ) -> Result<Option<InvestmentRecord>, StoreError>;

    /// All investments of a user, oldest first by `(created_at, seq)`.
    async fn find_investments_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<InvestmentRecord>, StoreError>;

    async fn insert_investment(
        &self,
        investment: &NewInvestment,
    ) -> Result<InvestmentRecord, StoreError> {
        let (record, _) = self.insert_investment_with_updates(investment, &[]).await?;
        Ok(record)
    }

    /// Insert an investment together with its first updates in one transaction.
    ///
    /// Every update must reference the new investment. On error nothing is
    /// written.
    async fn insert_investment_with_updates(
        &self,
        investment: &NewInvestment,
        updates: &[CreateInvestmentUpdateCommand],
    ) -> Result<(InvestmentRecord, Vec<UpdateRecord>), StoreError>;

    /// Returns whether a row was deleted.
    async fn delete_investment_by_id(&self, id: InvestmentId) -> Result<bool, StoreError>;

    /// Write the absolute lock flag. Returns whether the investment exists.
    async fn set_investment_locked(
        &self,
        id: InvestmentId,
        locked: bool,
    ) -> Result<bool, StoreError>;
}

/// Investment update rows.
#[async_trait]
pub trait UpdateStore: Send + Sync + fmt::Debug {
    async fn find_update_by_id(&self, id: UpdateId) -> Result<Option<UpdateRecord>, StoreError>;

    /// Updates of the given investments, optionally with `date >= date_from`,
    /// ordered by `(date, seq)`.
    ///
    /// The ledger services always pass `None`: a cost is a prefix sum over an
    /// investment's whole history, so a window bounded here would drop the
    /// contributions before it. They filter the window in memory after
    /// computing costs. The bound is for callers that read raw rows only.
    async fn find_updates(
        &self,
        investment_ids: &[InvestmentId],
        date_from: Option<NaiveDate>,
    ) -> Result<Vec<UpdateRecord>, StoreError>;

    /// Floor lookup: the latest update of the investment with `date <= date`,
    /// latest `seq` winning on equal dates.
    async fn find_last_update_at_or_before(
        &self,
        investment_id: InvestmentId,
        date: NaiveDate,
    ) -> Result<Option<UpdateRecord>, StoreError>;

    async fn insert_update(
        &self,
        command: &CreateInvestmentUpdateCommand,
    ) -> Result<UpdateRecord, StoreError>;

    /// Insert a batch of updates in one transaction, in input order.
    /// On error nothing is written.
    async fn insert_updates(
        &self,
        commands: &[CreateInvestmentUpdateCommand],
    ) -> Result<Vec<UpdateRecord>, StoreError>;

    /// Returns whether a row was deleted.
    async fn delete_update_by_id(&self, id: UpdateId) -> Result<bool, StoreError>;

    /// Returns the number of deleted rows.
    async fn delete_updates_by_investment_id(
        &self,
        investment_id: InvestmentId,
    ) -> Result<u64, StoreError>;
}

/// User rows.
#[async_trait]
pub trait UserStore: Send + Sync + fmt::Debug {
    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_billing_customer_id(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Demo users created strictly before `created_before`, oldest first.
    async fn find_demo_users_created_before(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError>;

    async fn insert_user(&self, user: &User) -> Result<User, StoreError>;

    /// Persist email, provider, account type and billing customer id.
    /// Returns whether the user exists.
    async fn update_user(&self, user: &User) -> Result<bool, StoreError>;

    async fn delete_user_by_id(&self, id: &UserId) -> Result<bool, StoreError>;
}

/// Settings rows.
#[async_trait]
pub trait SettingsStore: Send + Sync + fmt::Debug {
    async fn find_settings_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Settings>, StoreError>;

    async fn upsert_settings(&self, settings: &Settings) -> Result<Settings, StoreError>;

    async fn delete_settings_by_user_id(&self, user_id: &UserId) -> Result<bool, StoreError>;
}
