//! In-memory store for testing without a database.
//!
//! Mirrors the SQLite schema's reference rule: an update cannot be inserted
//! for a missing investment, and an investment with updates cannot be deleted.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::store::{InvestmentStore, SettingsStore, StoreError, UpdateStore, UserStore};
use crate::domain::ordering::sort_records_deterministic;
use crate::domain::{
    CreateInvestmentUpdateCommand, InvestmentId, InvestmentRecord, NewInvestment, Settings,
    UpdateId, UpdateRecord, User, UserId,
};

#[derive(Debug, Default)]
struct State {
    investments: Vec<InvestmentRecord>,
    updates: Vec<UpdateRecord>,
    users: HashMap<UserId, User>,
    settings: HashMap<UserId, Settings>,
    next_seq: i64,
    failing: HashSet<&'static str>,
}

impl State {
    fn next_seq(&mut self) -> i64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.failing.contains(operation) {
            return Err(StoreError::Unavailable(operation.to_string()));
        }
        Ok(())
    }

    fn require_investment(&self, id: InvestmentId) -> Result<(), StoreError> {
        if !self.investments.iter().any(|i| i.id == id) {
            return Err(StoreError::Constraint(format!(
                "investment {} does not exist",
                id
            )));
        }
        Ok(())
    }

    /// Append without checks; callers validate every row first.
    fn push_update(&mut self, command: &CreateInvestmentUpdateCommand) -> UpdateRecord {
        let record = UpdateRecord {
            id: UpdateId::new_random(),
            investment_id: command.investment_id,
            date: command.date,
            deposit: command.deposit,
            withdrawal: command.withdrawal,
            value: command.value,
            seq: self.next_seq(),
        };
        self.updates.push(record.clone());
        record
    }
}

/// Store backed by process memory.
///
/// Operations named with [`MemoryStore::with_failure`] or
/// [`MemoryStore::fail`] return [`StoreError::Unavailable`] until cleared.
/// Names match the store trait method names, e.g. `"insert_update"`.
/// `insert_investment_with_updates` also honors `"insert_investment"`, and
/// `"insert_update"` when it carries updates. Failing writes leave no rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` fail from the start.
    pub fn with_failure(self, operation: &'static str) -> Self {
        self.fail(operation);
        self
    }

    /// Make `operation` fail until [`MemoryStore::clear_failures`] is called.
    pub fn fail(&self, operation: &'static str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(operation);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.clear();
        }
    }

    /// Number of stored updates across all investments.
    pub fn update_count(&self) -> usize {
        self.state.lock().map(|s| s.updates.len()).unwrap_or(0)
    }

    fn state(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, StoreError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("state lock poisoned".to_string()))?;
        state.check(operation)?;
        Ok(state)
    }
}

#[async_trait]
impl InvestmentStore for MemoryStore {
    async fn find_investment_by_id(
        &self,
        id: InvestmentId,
    ) -> Result<Option<InvestmentRecord>, StoreError> {
        let state = self.state("find_investment_by_id")?;
        Ok(state.investments.iter().find(|i| i.id == id).cloned())
    }

    async fn find_investments_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<InvestmentRecord>, StoreError> {
        let state = self.state("find_investments_by_user_id")?;
        let mut out: Vec<InvestmentRecord> = state
            .investments
            .iter()
            .filter(|i| &i.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|i| i.creation_key());
        Ok(out)
    }

    async fn insert_investment_with_updates(
        &self,
        investment: &NewInvestment,
        updates: &[CreateInvestmentUpdateCommand],
    ) -> Result<(InvestmentRecord, Vec<UpdateRecord>), StoreError> {
        let mut state = self.state("insert_investment_with_updates")?;
        state.check("insert_investment")?;
        if !updates.is_empty() {
            state.check("insert_update")?;
        }
        if state.investments.iter().any(|i| i.id == investment.id) {
            return Err(StoreError::Constraint(format!(
                "duplicate investment {}",
                investment.id
            )));
        }
        if let Some(stray) = updates.iter().find(|u| u.investment_id != investment.id) {
            return Err(StoreError::Constraint(format!(
                "update for {} inserted with investment {}",
                stray.investment_id, investment.id
            )));
        }

        let record = InvestmentRecord {
            id: investment.id,
            investment_type: investment.investment_type,
            name: investment.name.clone(),
            user_id: investment.user_id.clone(),
            locked: investment.locked,
            created_at: investment.created_at,
            seq: state.next_seq(),
        };
        state.investments.push(record.clone());
        let records = updates.iter().map(|u| state.push_update(u)).collect();
        Ok((record, records))
    }

    async fn delete_investment_by_id(&self, id: InvestmentId) -> Result<bool, StoreError> {
        let mut state = self.state("delete_investment_by_id")?;
        if state.updates.iter().any(|u| u.investment_id == id) {
            return Err(StoreError::Constraint(format!(
                "investment {} still has updates",
                id
            )));
        }

        let before = state.investments.len();
        state.investments.retain(|i| i.id != id);
        Ok(state.investments.len() < before)
    }

    async fn set_investment_locked(
        &self,
        id: InvestmentId,
        locked: bool,
    ) -> Result<bool, StoreError> {
        let mut state = self.state("set_investment_locked")?;
        match state.investments.iter_mut().find(|i| i.id == id) {
            Some(investment) => {
                investment.locked = locked;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UpdateStore for MemoryStore {
    async fn find_update_by_id(&self, id: UpdateId) -> Result<Option<UpdateRecord>, StoreError> {
        let state = self.state("find_update_by_id")?;
        Ok(state.updates.iter().find(|u| u.id == id).cloned())
    }

    async fn find_updates(
        &self,
        investment_ids: &[InvestmentId],
        date_from: Option<NaiveDate>,
    ) -> Result<Vec<UpdateRecord>, StoreError> {
        let state = self.state("find_updates")?;
        let mut out: Vec<UpdateRecord> = state
            .updates
            .iter()
            .filter(|u| investment_ids.contains(&u.investment_id))
            .filter(|u| date_from.map_or(true, |from| u.date >= from))
            .cloned()
            .collect();
        sort_records_deterministic(&mut out);
        Ok(out)
    }

    async fn find_last_update_at_or_before(
        &self,
        investment_id: InvestmentId,
        date: NaiveDate,
    ) -> Result<Option<UpdateRecord>, StoreError> {
        let state = self.state("find_last_update_at_or_before")?;
        Ok(state
            .updates
            .iter()
            .filter(|u| u.investment_id == investment_id && u.date <= date)
            .max_by_key(|u| (u.date, u.seq))
            .cloned())
    }

    async fn insert_update(
        &self,
        command: &CreateInvestmentUpdateCommand,
    ) -> Result<UpdateRecord, StoreError> {
        let mut state = self.state("insert_update")?;
        state.require_investment(command.investment_id)?;
        Ok(state.push_update(command))
    }

    async fn insert_updates(
        &self,
        commands: &[CreateInvestmentUpdateCommand],
    ) -> Result<Vec<UpdateRecord>, StoreError> {
        let mut state = self.state("insert_updates")?;
        for command in commands {
            state.require_investment(command.investment_id)?;
        }
        Ok(commands.iter().map(|c| state.push_update(c)).collect())
    }

    async fn delete_update_by_id(&self, id: UpdateId) -> Result<bool, StoreError> {
        let mut state = self.state("delete_update_by_id")?;
        let before = state.updates.len();
        state.updates.retain(|u| u.id != id);
        Ok(state.updates.len() < before)
    }

    async fn delete_updates_by_investment_id(
        &self,
        investment_id: InvestmentId,
    ) -> Result<u64, StoreError> {
        let mut state = self.state("delete_updates_by_investment_id")?;
        let before = state.updates.len();
        state.updates.retain(|u| u.investment_id != investment_id);
        Ok((before - state.updates.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let state = self.state("find_user_by_id")?;
        Ok(state.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state("find_user_by_email")?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_billing_customer_id(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let state = self.state("find_user_by_billing_customer_id")?;
        Ok(state
            .users
            .values()
            .find(|u| u.billing_customer_id.as_deref() == Some(billing_customer_id))
            .cloned())
    }

    async fn find_demo_users_created_before(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        let state = self.state("find_demo_users_created_before")?;
        let mut out: Vec<User> = state
            .users
            .values()
            .filter(|u| u.is_demo && u.created_at < created_before)
            .cloned()
            .collect();
        out.sort_by_key(|u| u.created_at);
        Ok(out)
    }

    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        let mut state = self.state("insert_user")?;
        if state.users.contains_key(&user.id) {
            return Err(StoreError::Constraint(format!("duplicate user {}", user.id)));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut state = self.state("update_user")?;
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                existing.email = user.email.clone();
                existing.provider = user.provider.clone();
                existing.account_type = user.account_type;
                existing.billing_customer_id = user.billing_customer_id.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user_by_id(&self, id: &UserId) -> Result<bool, StoreError> {
        let mut state = self.state("delete_user_by_id")?;
        Ok(state.users.remove(id).is_some())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn find_settings_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Settings>, StoreError> {
        let state = self.state("find_settings_by_user_id")?;
        Ok(state.settings.get(user_id).cloned())
    }

    async fn upsert_settings(&self, settings: &Settings) -> Result<Settings, StoreError> {
        let mut state = self.state("upsert_settings")?;
        state
            .settings
            .insert(settings.user_id.clone(), settings.clone());
        Ok(settings.clone())
    }

    async fn delete_settings_by_user_id(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let mut state = self.state("delete_settings_by_user_id")?;
        Ok(state.settings.remove(user_id).is_some())
    }
}
