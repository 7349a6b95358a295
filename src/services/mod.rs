//! Request-scoped ledger services over the shared store.
//!
//! Creating an investment with its seed update and importing a CSV batch
//! commit in one store transaction each, so a failure writes nothing.
//! The remaining multi-step commands (delete-updates-then-investment,
//! lock-N-investments, user deletion) commit each step on its own. Those
//! steps are idempotent, so a command that failed halfway is recovered by
//! invoking it again.

pub mod csv;
pub mod demo;
pub mod investment;
pub mod settings;
pub mod update;
pub mod user;

use std::sync::Arc;
use thiserror::Error;

use crate::db::{InvestmentStore, SettingsStore, StoreError, UpdateStore, UserStore};
use crate::domain::{InvestmentId, UpdateId, UserId};

pub use self::csv::{CsvError, InvestmentUpdateCsv};
pub use demo::{DemoUserCleaner, DemoUserFactory};
pub use investment::InvestmentService;
pub use settings::SettingsService;
pub use update::InvestmentUpdateService;
pub use user::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("investment {0} not found")]
    InvestmentNotFound(InvestmentId),
    #[error("investment update {0} not found")]
    UpdateNotFound(UpdateId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("maximum number of investments reached for a basic account")]
    MaxInvestmentsReached,
    #[error("investment {0} is locked")]
    InvestmentLocked(InvestmentId),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },
}

/// Attach operation context to store errors.
pub(crate) trait StoreContext<T> {
    fn context<F>(self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> String;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    fn context<F>(self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| ServiceError::Store {
            context: f(),
            source,
        })
    }
}

/// All services wired over one store.
#[derive(Debug, Clone)]
pub struct Services {
    pub investments: Arc<InvestmentService>,
    pub updates: Arc<InvestmentUpdateService>,
    pub users: Arc<UserService>,
    pub settings: Arc<SettingsService>,
}

impl Services {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: InvestmentStore + UpdateStore + UserStore + SettingsStore + 'static,
    {
        let investment_store: Arc<dyn InvestmentStore> = store.clone();
        let update_store: Arc<dyn UpdateStore> = store.clone();
        let user_store: Arc<dyn UserStore> = store.clone();
        let settings_store: Arc<dyn SettingsStore> = store;

        let updates = Arc::new(InvestmentUpdateService::new(
            investment_store.clone(),
            update_store,
        ));
        let investments = Arc::new(InvestmentService::new(investment_store, updates.clone()));
        let settings = Arc::new(SettingsService::new(settings_store));
        let users = Arc::new(UserService::new(
            user_store,
            investments.clone(),
            settings.clone(),
        ));

        Services {
            investments,
            updates,
            users,
            settings,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Services;
    use crate::db::MemoryStore;
    use crate::domain::{AccountType, User, UserId};
    use std::sync::Arc;

    pub fn memory_services() -> (Services, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Services::new(store.clone()), store)
    }

    pub fn user(id: &str, account_type: AccountType) -> User {
        let mut user = User::new(UserId::new(id), format!("{}@example.com", id), "google");
        user.account_type = account_type;
        user
    }
}
