//! Investment updates: point-in-time snapshots of cash flows and value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{InvestmentId, UpdateId};

/// An update as it is stored: no derived fields.
///
/// `seq` is the store-assigned insertion sequence. It orders updates that
/// share the same date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub id: UpdateId,
    pub investment_id: InvestmentId,
    pub date: NaiveDate,
    pub deposit: Option<i64>,
    pub withdrawal: Option<i64>,
    pub value: i64,
    pub seq: i64,
}

impl UpdateRecord {
    /// Net cash contributed by this single update (deposit minus withdrawal).
    pub fn net_contribution(&self) -> i64 {
        self.deposit.unwrap_or(0) - self.withdrawal.unwrap_or(0)
    }

    /// Attach a cost basis, producing the domain view of this update.
    pub fn with_cost(&self, cost: i64) -> InvestmentUpdate {
        InvestmentUpdate {
            id: self.id,
            investment_id: self.investment_id,
            date: self.date,
            deposit: self.deposit,
            withdrawal: self.withdrawal,
            cost,
            value: self.value,
        }
    }
}

/// An update with its cost basis attached.
///
/// All amounts are integers in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentUpdate {
    pub id: UpdateId,
    pub investment_id: InvestmentId,
    pub date: NaiveDate,
    pub deposit: Option<i64>,
    pub withdrawal: Option<i64>,
    /// Running net contribution up to and including this update.
    pub cost: i64,
    /// Total mark-to-market value at `date`.
    pub value: i64,
}

/// Command to append an update to an investment's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvestmentUpdateCommand {
    pub investment_id: InvestmentId,
    pub date: NaiveDate,
    pub deposit: Option<i64>,
    pub withdrawal: Option<i64>,
    pub value: i64,
}

impl CreateInvestmentUpdateCommand {
    pub fn new(
        investment_id: InvestmentId,
        date: NaiveDate,
        deposit: Option<i64>,
        withdrawal: Option<i64>,
        value: i64,
    ) -> Self {
        Self {
            investment_id,
            date,
            deposit,
            withdrawal,
            value,
        }
    }

    /// Deposits and withdrawals, when present, must be strictly positive.
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.deposit, Some(d) if d <= 0) {
            return Err("deposit must be positive".to_string());
        }
        if matches!(self.withdrawal, Some(w) if w <= 0) {
            return Err("withdrawal must be positive".to_string());
        }
        Ok(())
    }
}

/// Query descriptor for the ledger: which investments, and from which day.
///
/// The investment set is the access-control boundary and must already be
/// filtered by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FindInvestmentUpdateQuery {
    pub investment_ids: Vec<InvestmentId>,
    /// Inclusive lower bound.
    pub date_from: Option<NaiveDate>,
}

impl FindInvestmentUpdateQuery {
    pub fn new(investment_ids: Vec<InvestmentId>, date_from: Option<NaiveDate>) -> Self {
        Self {
            investment_ids,
            date_from,
        }
    }
}
