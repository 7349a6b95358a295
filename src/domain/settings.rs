//! Per-user presentation settings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::UserId;

/// Display currency. Amounts are never converted between currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("unsupported currency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub user_id: UserId,
    pub currency: Currency,
}

impl Settings {
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        Self { user_id, currency }
    }

    /// Settings used when the user never saved any.
    pub fn default_for(user_id: UserId) -> Self {
        Self {
            user_id,
            currency: Currency::Usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_currency_is_usd() {
        let settings = Settings::default_for(UserId::new("u1"));
        assert_eq!(settings.currency, Currency::Usd);
    }

    #[test]
    fn test_currency_serialization() {
        assert_eq!(serde_json::to_string(&Currency::Eur).unwrap(), "\"EUR\"");
        assert_eq!(Currency::from_str("USD").unwrap(), Currency::Usd);
        assert!(Currency::from_str("usd").is_err());
    }
}
