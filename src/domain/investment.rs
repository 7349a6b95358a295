//! Investments and the commands that create them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{InvestmentId, InvestmentUpdate, User, UserId};

/// Instrument class of an investment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvestmentType {
    Stock,
    Bond,
    Commodity,
    Fund,
    Crypto,
    Cash,
    P2pLending,
    RealEstate,
    Forex,
}

impl InvestmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentType::Stock => "stock",
            InvestmentType::Bond => "bond",
            InvestmentType::Commodity => "commodity",
            InvestmentType::Fund => "fund",
            InvestmentType::Crypto => "crypto",
            InvestmentType::Cash => "cash",
            InvestmentType::P2pLending => "p2pLending",
            InvestmentType::RealEstate => "realEstate",
            InvestmentType::Forex => "forex",
        }
    }
}

impl std::fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock" => Ok(InvestmentType::Stock),
            "bond" => Ok(InvestmentType::Bond),
            "commodity" => Ok(InvestmentType::Commodity),
            "fund" => Ok(InvestmentType::Fund),
            "crypto" => Ok(InvestmentType::Crypto),
            "cash" => Ok(InvestmentType::Cash),
            "p2pLending" => Ok(InvestmentType::P2pLending),
            "realEstate" => Ok(InvestmentType::RealEstate),
            "forex" => Ok(InvestmentType::Forex),
            other => Err(format!("unknown investment type: {}", other)),
        }
    }
}

/// An investment row as stored. `seq` breaks ties between equal `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentRecord {
    pub id: InvestmentId,
    pub investment_type: InvestmentType,
    pub name: String,
    pub user_id: UserId,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
}

impl InvestmentRecord {
    /// Key ranking investments by creation order, oldest first.
    pub fn creation_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.seq)
    }

    pub fn with_last_update(self, last_update: Option<InvestmentUpdate>) -> Investment {
        Investment {
            id: self.id,
            investment_type: self.investment_type,
            name: self.name,
            user_id: self.user_id,
            locked: self.locked,
            created_at: self.created_at,
            last_update,
        }
    }
}

/// An investment with its derived last update.
///
/// `last_update` is computed on every read and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Investment {
    pub id: InvestmentId,
    pub investment_type: InvestmentType,
    pub name: String,
    pub user_id: UserId,
    /// A locked investment keeps its history but accepts no new updates.
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub last_update: Option<InvestmentUpdate>,
}

/// Values handed to the store when inserting an investment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvestment {
    pub id: InvestmentId,
    pub investment_type: InvestmentType,
    pub name: String,
    pub user_id: UserId,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
}

/// Optional first ledger entry written together with a new investment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialInvestmentUpdate {
    /// Defaults to today when absent.
    pub date: Option<NaiveDate>,
    pub deposit: Option<i64>,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvestmentCommand {
    pub investment_type: InvestmentType,
    pub name: String,
    pub user: User,
    pub locked: bool,
    pub initial_update: Option<InitialInvestmentUpdate>,
}

impl CreateInvestmentCommand {
    pub fn new(
        investment_type: InvestmentType,
        name: impl Into<String>,
        user: User,
        initial_update: Option<InitialInvestmentUpdate>,
    ) -> Self {
        Self {
            investment_type,
            name: name.into(),
            user,
            locked: false,
            initial_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_investment_type_serialization() {
        let json = serde_json::to_string(&InvestmentType::P2pLending).unwrap();
        assert_eq!(json, "\"p2pLending\"");
        let json = serde_json::to_string(&InvestmentType::RealEstate).unwrap();
        assert_eq!(json, "\"realEstate\"");
        let parsed: InvestmentType = serde_json::from_str("\"stock\"").unwrap();
        assert_eq!(parsed, InvestmentType::Stock);
    }

    #[test]
    fn test_investment_type_str_matches_serde() {
        for t in [
            InvestmentType::Stock,
            InvestmentType::Bond,
            InvestmentType::Commodity,
            InvestmentType::Fund,
            InvestmentType::Crypto,
            InvestmentType::Cash,
            InvestmentType::P2pLending,
            InvestmentType::RealEstate,
            InvestmentType::Forex,
        ] {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(InvestmentType::from_str(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn test_unknown_investment_type() {
        assert!(InvestmentType::from_str("tulips").is_err());
    }
}
