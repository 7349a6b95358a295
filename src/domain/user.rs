//! Users and subscription tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::UserId;

/// Provider name used for locally created (demo) users.
pub const USER_PROVIDER_LOCAL: &str = "local";

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Basic,
    Premium,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Basic => "basic",
            AccountType::Premium => "premium",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(AccountType::Basic),
            "premium" => Ok(AccountType::Premium),
            other => Err(format!("unknown account type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub provider: String,
    pub account_type: AccountType,
    /// Customer reference at the billing provider, set while premium.
    pub billing_customer_id: Option<String>,
    pub is_demo: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A new basic-tier user.
    pub fn new(id: UserId, email: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            provider: provider.into(),
            account_type: AccountType::Basic,
            billing_customer_id: None,
            is_demo: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_serialization() {
        assert_eq!(
            serde_json::to_string(&AccountType::Premium).unwrap(),
            "\"premium\""
        );
        assert_eq!(AccountType::from_str("basic").unwrap(), AccountType::Basic);
        assert!(AccountType::from_str("gold").is_err());
    }

    #[test]
    fn test_new_user_is_basic() {
        let user = User::new(UserId::new("u1"), "a@example.com", "google");
        assert_eq!(user.account_type, AccountType::Basic);
        assert!(user.billing_customer_id.is_none());
        assert!(!user.is_demo);
    }
}
