//! Investment lifecycle: capacity-checked creation, cascade deletion, locking.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::{InvestmentUpdateService, ServiceError, StoreContext};
use crate::db::InvestmentStore;
use crate::domain::{
    CreateInvestmentCommand, CreateInvestmentUpdateCommand, Investment, InvestmentId,
    InvestmentRecord, NewInvestment, UserId,
};
use crate::engine::{attach_costs, can_create};

#[derive(Debug, Clone)]
pub struct InvestmentService {
    investments: Arc<dyn InvestmentStore>,
    ledger: Arc<InvestmentUpdateService>,
}

impl InvestmentService {
    pub fn new(investments: Arc<dyn InvestmentStore>, ledger: Arc<InvestmentUpdateService>) -> Self {
        Self {
            investments,
            ledger,
        }
    }

    /// A user's investments, oldest first, each with its latest update.
    pub async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<Investment>, ServiceError> {
        let records = self.find_records_by_user_id(user_id).await?;
        let ids: Vec<InvestmentId> = records.iter().map(|r| r.id).collect();
        let mut last_updates = self.ledger.find_last_updates(&ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let last_update = last_updates.remove(&record.id);
                record.with_last_update(last_update)
            })
            .collect())
    }

    pub async fn find_by_id(&self, id: InvestmentId) -> Result<Investment, ServiceError> {
        let record = self
            .investments
            .find_investment_by_id(id)
            .await
            .context(|| format!("failed to find investment {}", id))?
            .ok_or(ServiceError::InvestmentNotFound(id))?;

        let mut last_updates = self.ledger.find_last_updates(&[id]).await?;
        Ok(record.with_last_update(last_updates.remove(&id)))
    }

    /// Stored investments of a user without derived fields, oldest first.
    pub async fn find_records_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<InvestmentRecord>, ServiceError> {
        self.investments
            .find_investments_by_user_id(user_id)
            .await
            .context(|| format!("failed to find investments of user {}", user_id))
    }

    /// Create an investment together with its optional seed update.
    ///
    /// Both rows are written in one store transaction, so a failed create
    /// leaves nothing behind and can be retried as is. A basic account
    /// already holding the maximum number of investments is refused with
    /// [`ServiceError::MaxInvestmentsReached`].
    pub async fn create(&self, command: CreateInvestmentCommand) -> Result<Investment, ServiceError> {
        let user = &command.user;
        let existing = self.find_records_by_user_id(&user.id).await?.len();
        if !can_create(user.account_type, existing) {
            warn!(
                user_id = %user.id,
                existing,
                "Investment creation refused: basic account at capacity"
            );
            return Err(ServiceError::MaxInvestmentsReached);
        }

        let new = NewInvestment {
            id: InvestmentId::new_random(),
            investment_type: command.investment_type,
            name: command.name.clone(),
            user_id: user.id.clone(),
            locked: command.locked,
            created_at: Utc::now(),
        };

        let seeds: Vec<CreateInvestmentUpdateCommand> = command
            .initial_update
            .iter()
            .map(|seed| {
                CreateInvestmentUpdateCommand::new(
                    new.id,
                    seed.date.unwrap_or_else(|| Utc::now().date_naive()),
                    seed.deposit,
                    None,
                    seed.value,
                )
            })
            .collect();
        for seed in &seeds {
            seed.validate().map_err(ServiceError::InvalidCommand)?;
        }
        // Locked investments take no updates, not even their seed.
        if new.locked && !seeds.is_empty() {
            return Err(ServiceError::InvestmentLocked(new.id));
        }

        let (record, updates) = self
            .investments
            .insert_investment_with_updates(&new, &seeds)
            .await
            .context(|| format!("failed to create investment for user {}", user.id))?;

        info!(
            investment_id = %record.id,
            user_id = %record.user_id,
            investment_type = %record.investment_type,
            seeded = !updates.is_empty(),
            "Investment created"
        );

        let last_update = attach_costs(&updates).pop();
        Ok(record.with_last_update(last_update))
    }

    /// Delete an investment together with all its updates.
    ///
    /// Updates go first; the store refuses to drop an investment that still
    /// has updates.
    pub async fn delete_by_id(&self, id: InvestmentId) -> Result<(), ServiceError> {
        let deleted_updates = self.ledger.delete_by_investment_id(id).await?;

        let deleted = self
            .investments
            .delete_investment_by_id(id)
            .await
            .context(|| format!("failed to delete investment {}", id))?;
        if !deleted {
            return Err(ServiceError::InvestmentNotFound(id));
        }

        info!(investment_id = %id, deleted_updates, "Investment deleted");
        Ok(())
    }

    /// Write the lock flag of an investment.
    pub async fn update_locked(&self, id: InvestmentId, locked: bool) -> Result<(), ServiceError> {
        let found = self
            .investments
            .set_investment_locked(id, locked)
            .await
            .context(|| format!("failed to set locked={} on investment {}", locked, id))?;
        if !found {
            return Err(ServiceError::InvestmentNotFound(id));
        }
        info!(investment_id = %id, locked, "Investment lock updated");
        Ok(())
    }
}
