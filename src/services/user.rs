//! Users and subscription tier transitions.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::{InvestmentService, ServiceError, SettingsService, StoreContext};
use crate::db::UserStore;
use crate::domain::{AccountType, User, UserId};
use crate::engine::plan_lock_changes;

#[derive(Debug, Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    investments: Arc<InvestmentService>,
    settings: Arc<SettingsService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        investments: Arc<InvestmentService>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            users,
            investments,
            settings,
        }
    }

    pub async fn find_by_id(&self, id: &UserId) -> Result<User, ServiceError> {
        self.users
            .find_user_by_id(id)
            .await
            .context(|| format!("failed to find user {}", id))?
            .ok_or_else(|| ServiceError::UserNotFound(id.clone()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        self.users
            .find_user_by_email(email)
            .await
            .context(|| "failed to find user by email".to_string())
    }

    pub async fn find_by_billing_customer_id(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<User>, ServiceError> {
        self.users
            .find_user_by_billing_customer_id(billing_customer_id)
            .await
            .context(|| format!("failed to find user by customer {}", billing_customer_id))
    }

    pub async fn find_demo_users_created_before(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<User>, ServiceError> {
        self.users
            .find_demo_users_created_before(created_before)
            .await
            .context(|| "failed to find demo users".to_string())
    }

    pub async fn create(&self, user: &User) -> Result<User, ServiceError> {
        let created = self
            .users
            .insert_user(user)
            .await
            .context(|| format!("failed to create user {}", user.id))?;
        info!(user_id = %created.id, is_demo = created.is_demo, "User created");
        Ok(created)
    }

    /// Switch the user to premium and unlock every locked investment.
    pub async fn upgrade_to_premium(
        &self,
        user: &User,
        billing_customer_id: &str,
    ) -> Result<User, ServiceError> {
        let upgraded = User {
            account_type: AccountType::Premium,
            billing_customer_id: Some(billing_customer_id.to_string()),
            ..user.clone()
        };
        self.persist(&upgraded).await?;
        let changed = self.apply_tier_locks(&upgraded).await?;

        info!(user_id = %upgraded.id, unlocked = changed, "User upgraded to premium");
        Ok(upgraded)
    }

    /// Switch the user to basic and lock every investment beyond the cap,
    /// oldest investments staying open.
    pub async fn downgrade_to_basic(&self, user: &User) -> Result<User, ServiceError> {
        let downgraded = User {
            account_type: AccountType::Basic,
            billing_customer_id: None,
            ..user.clone()
        };
        self.persist(&downgraded).await?;
        let changed = self.apply_tier_locks(&downgraded).await?;

        info!(user_id = %downgraded.id, locked = changed, "User downgraded to basic");
        Ok(downgraded)
    }

    /// Delete a user with all investments and settings.
    pub async fn delete_by_id(&self, id: &UserId) -> Result<(), ServiceError> {
        let records = self.investments.find_records_by_user_id(id).await?;
        for record in &records {
            self.investments.delete_by_id(record.id).await?;
        }
        self.settings.delete_by_user_id(id).await?;

        let deleted = self
            .users
            .delete_user_by_id(id)
            .await
            .context(|| format!("failed to delete user {}", id))?;
        if !deleted {
            return Err(ServiceError::UserNotFound(id.clone()));
        }

        info!(user_id = %id, investments = records.len(), "User deleted");
        Ok(())
    }

    async fn persist(&self, user: &User) -> Result<(), ServiceError> {
        let found = self
            .users
            .update_user(user)
            .await
            .context(|| format!("failed to update user {}", user.id))?;
        if !found {
            return Err(ServiceError::UserNotFound(user.id.clone()));
        }
        Ok(())
    }

    /// Bring lock flags in line with the user's tier. Returns how many flags
    /// were written.
    async fn apply_tier_locks(&self, user: &User) -> Result<usize, ServiceError> {
        let records = self.investments.find_records_by_user_id(&user.id).await?;
        let changes = plan_lock_changes(user.account_type, &records);
        for change in &changes {
            self.investments
                .update_locked(change.investment_id, change.locked)
                .await?;
        }
        Ok(changes.len())
    }
}
