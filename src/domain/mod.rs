//! Domain types for the investment ledger.
//!
//! This module provides:
//! - Identifier and calendar-day primitives
//! - Investments, updates and the commands that create them
//! - Users, subscription tiers and presentation settings
//! - Stable update ordering for deterministic processing

pub mod investment;
pub mod ordering;
pub mod primitives;
pub mod settings;
pub mod update;
pub mod user;

pub use investment::{
    CreateInvestmentCommand, InitialInvestmentUpdate, Investment, InvestmentRecord,
    InvestmentType, NewInvestment,
};
pub use ordering::UpdateOrderingKey;
pub use primitives::{
    format_date, parse_date, IdParseError, InvestmentId, UpdateId, UserId, DATE_FORMAT,
};
pub use settings::{Currency, Settings};
pub use update::{
    CreateInvestmentUpdateCommand, FindInvestmentUpdateQuery, InvestmentUpdate, UpdateRecord,
};
pub use user::{AccountType, User, USER_PROVIDER_LOCAL};
