pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod services;

pub use config::Config;
pub use db::{init_db, MemoryStore, Repository, StoreError};
pub use domain::{
    AccountType, Currency, Investment, InvestmentId, InvestmentType, InvestmentUpdate, UpdateId,
    User, UserId,
};
pub use error::AppError;
pub use services::{ServiceError, Services};
