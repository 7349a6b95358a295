//! Short-lived demo accounts.

use chrono::{Duration, Months, Utc};
use std::sync::Arc;
use tracing::{error, info};

use super::{InvestmentService, ServiceError, UserService};
use crate::domain::{
    AccountType, CreateInvestmentCommand, InitialInvestmentUpdate, InvestmentType, User, UserId,
    USER_PROVIDER_LOCAL,
};

pub const DEMO_USER_EMAIL: &str = "demo@growfolio.local";

/// Portfolio every demo account starts with: type, name, seed deposit and value.
const DEMO_PORTFOLIO: [(InvestmentType, &str, i64); 5] = [
    (InvestmentType::Fund, "World Equity", 10_000),
    (InvestmentType::Fund, "Emerging Markets", 10_000),
    (InvestmentType::Fund, "Small Cap", 10_000),
    (InvestmentType::Crypto, "Bitcoin", 10_000),
    (InvestmentType::Cash, "Cash", 1_000_000),
];

/// Creates demo users with a seeded portfolio.
#[derive(Debug, Clone)]
pub struct DemoUserFactory {
    users: Arc<UserService>,
    investments: Arc<InvestmentService>,
}

impl DemoUserFactory {
    pub fn new(users: Arc<UserService>, investments: Arc<InvestmentService>) -> Self {
        Self { users, investments }
    }

    /// Create a premium demo user holding the demo portfolio, seeded three
    /// years back.
    pub async fn create(&self) -> Result<User, ServiceError> {
        let mut demo = User::new(
            UserId::new(uuid::Uuid::new_v4().to_string()),
            DEMO_USER_EMAIL,
            USER_PROVIDER_LOCAL,
        );
        demo.account_type = AccountType::Premium;
        demo.is_demo = true;
        let demo = self.users.create(&demo).await?;

        let today = Utc::now().date_naive();
        let seed_date = today.checked_sub_months(Months::new(36)).unwrap_or(today);

        for (investment_type, name, amount) in DEMO_PORTFOLIO {
            self.investments
                .create(CreateInvestmentCommand::new(
                    investment_type,
                    name,
                    demo.clone(),
                    Some(InitialInvestmentUpdate {
                        date: Some(seed_date),
                        deposit: Some(amount),
                        value: amount,
                    }),
                ))
                .await?;
        }

        info!(user_id = %demo.id, "Demo user created");
        Ok(demo)
    }
}

/// Deletes demo users older than a time-to-live.
#[derive(Debug, Clone)]
pub struct DemoUserCleaner {
    users: Arc<UserService>,
    ttl: Duration,
}

impl DemoUserCleaner {
    pub fn new(users: Arc<UserService>, ttl: Duration) -> Self {
        Self { users, ttl }
    }

    /// Delete every expired demo user. A failure for one user is logged and
    /// the others are still processed. Returns how many users were deleted.
    pub async fn clean(&self) -> usize {
        info!("Cleaning demo users...");

        let created_before = match Utc::now().checked_sub_signed(self.ttl) {
            Some(at) => at,
            None => {
                error!(ttl_secs = self.ttl.num_seconds(), "Demo user TTL out of range");
                return 0;
            }
        };
        let demo_users = match self.users.find_demo_users_created_before(created_before).await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "Failed to find demo users");
                return 0;
            }
        };

        let mut deleted = 0;
        for demo_user in &demo_users {
            match self.users.delete_by_id(&demo_user.id).await {
                Ok(()) => {
                    info!(user_id = %demo_user.id, "Deleted demo user");
                    deleted += 1;
                }
                Err(e) => {
                    error!(user_id = %demo_user.id, error = %e, "Failed to delete demo user");
                }
            }
        }
        deleted
    }

    /// Run [`DemoUserCleaner::clean`] on a fixed interval, forever.
    pub async fn run(self, every: std::time::Duration) {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            self.clean().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserStore;
    use crate::services::test_support::memory_services;

    #[tokio::test]
    async fn test_factory_seeds_portfolio() {
        let (services, _store) = memory_services();
        let factory = DemoUserFactory::new(services.users.clone(), services.investments.clone());

        let demo = factory.create().await.unwrap();
        assert!(demo.is_demo);
        assert_eq!(demo.account_type, AccountType::Premium);

        let investments = services.investments.find_by_user_id(&demo.id).await.unwrap();
        assert_eq!(investments.len(), DEMO_PORTFOLIO.len());
        assert!(investments.iter().all(|i| !i.locked));
        assert!(investments.iter().all(|i| i
            .last_update
            .as_ref()
            .map_or(false, |u| u.cost == u.value)));
    }

    #[tokio::test]
    async fn test_clean_deletes_only_expired_demo_users() {
        let (services, store) = memory_services();

        let mut expired = User::new(UserId::new("expired"), DEMO_USER_EMAIL, USER_PROVIDER_LOCAL);
        expired.is_demo = true;
        expired.created_at = Utc::now() - Duration::hours(48);
        store.insert_user(&expired).await.unwrap();

        let mut fresh = User::new(UserId::new("fresh"), DEMO_USER_EMAIL, USER_PROVIDER_LOCAL);
        fresh.is_demo = true;
        store.insert_user(&fresh).await.unwrap();

        let mut real = User::new(UserId::new("real"), "real@example.com", "google");
        real.created_at = Utc::now() - Duration::hours(48);
        store.insert_user(&real).await.unwrap();

        let cleaner = DemoUserCleaner::new(services.users.clone(), Duration::hours(24));
        assert_eq!(cleaner.clean().await, 1);

        assert!(services.users.find_by_id(&expired.id).await.is_err());
        assert!(services.users.find_by_id(&fresh.id).await.is_ok());
        assert!(services.users.find_by_id(&real.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_clean_retries_on_next_run() {
        let (services, store) = memory_services();
        let factory = DemoUserFactory::new(services.users.clone(), services.investments.clone());
        factory.create().await.unwrap();

        store.fail("delete_settings_by_user_id");
        let cleaner = DemoUserCleaner::new(services.users.clone(), Duration::hours(-1));
        assert_eq!(cleaner.clean().await, 0);

        store.clear_failures();
        assert_eq!(cleaner.clean().await, 1);
    }

    #[tokio::test]
    async fn test_clean_with_out_of_range_ttl_deletes_nothing() {
        let (services, _store) = memory_services();
        let factory = DemoUserFactory::new(services.users.clone(), services.investments.clone());
        let demo = factory.create().await.unwrap();

        let ttl = Duration::try_days(100_000_000).unwrap();
        let cleaner = DemoUserCleaner::new(services.users.clone(), ttl);
        assert_eq!(cleaner.clean().await, 0);
        assert!(services.users.find_by_id(&demo.id).await.is_ok());
    }
}
