//! JSON shapes shared by the handlers.

use crate::domain::{format_date, Investment, InvestmentType, InvestmentUpdate, User};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentUpdateDto {
    pub id: String,
    pub investment_id: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal: Option<i64>,
    pub cost: i64,
    pub value: i64,
}

impl From<&InvestmentUpdate> for InvestmentUpdateDto {
    fn from(u: &InvestmentUpdate) -> Self {
        Self {
            id: u.id.to_string(),
            investment_id: u.investment_id.to_string(),
            date: format_date(u.date),
            deposit: u.deposit,
            withdrawal: u.withdrawal,
            cost: u.cost,
            value: u.value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentDto {
    pub id: String,
    #[serde(rename = "type")]
    pub investment_type: InvestmentType,
    pub name: String,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub last_update: Option<InvestmentUpdateDto>,
}

impl From<&Investment> for InvestmentDto {
    fn from(i: &Investment) -> Self {
        Self {
            id: i.id.to_string(),
            investment_type: i.investment_type,
            name: i.name.clone(),
            locked: i.locked,
            created_at: i.created_at,
            last_update: i.last_update.as_ref().map(InvestmentUpdateDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub provider: String,
    pub account_type: String,
    pub is_demo: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            email: u.email.clone(),
            provider: u.provider.clone(),
            account_type: u.account_type.to_string(),
            is_demo: u.is_demo,
            created_at: u.created_at,
        }
    }
}
