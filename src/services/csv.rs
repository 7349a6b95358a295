//! CSV import and export of an investment's ledger.
//!
//! Format: header `Date,Deposit,Withdrawal,Value`, dates as `YYYY-MM-DD`,
//! amounts as integers in minor units, empty deposit or withdrawal meaning
//! absent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::{InvestmentUpdateService, ServiceError};
use crate::domain::{
    format_date, parse_date, CreateInvestmentUpdateCommand, Investment, InvestmentId,
    InvestmentUpdate,
};

pub const CSV_HEADER: [&str; 4] = ["Date", "Deposit", "Withdrawal", "Value"];

#[derive(Debug, Error)]
pub enum CsvError {
    /// `row` is 1-based and counts data rows only.
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
    #[error("csv: {0}")]
    Csv(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Deposit")]
    deposit: Option<i64>,
    #[serde(rename = "Withdrawal")]
    withdrawal: Option<i64>,
    #[serde(rename = "Value")]
    value: i64,
}

/// An export ready to be sent as a file attachment.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

/// Parse a whole CSV document into update commands for one investment.
///
/// Nothing is returned unless every row parses.
pub fn parse_updates(
    investment_id: InvestmentId,
    csv_bytes: &[u8],
) -> Result<Vec<CreateInvestmentUpdateCommand>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_bytes);

    let mut commands = Vec::new();
    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = index + 1;
        let record = record.map_err(|e| CsvError::InvalidRow {
            row,
            message: e.to_string(),
        })?;
        let date: NaiveDate = parse_date(&record.date).map_err(|e| CsvError::InvalidRow {
            row,
            message: format!("invalid date {:?}: {}", record.date, e),
        })?;

        let command = CreateInvestmentUpdateCommand::new(
            investment_id,
            date,
            record.deposit,
            record.withdrawal,
            record.value,
        );
        command
            .validate()
            .map_err(|message| CsvError::InvalidRow { row, message })?;
        commands.push(command);
    }

    Ok(commands)
}

/// Render updates in the given order under the standard header.
pub fn write_updates(updates: &[InvestmentUpdate]) -> Result<Vec<u8>, CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| CsvError::Csv(e.to_string()))?;

    for update in updates {
        writer
            .write_record([
                format_date(update.date),
                update.deposit.map(|d| d.to_string()).unwrap_or_default(),
                update.withdrawal.map(|w| w.to_string()).unwrap_or_default(),
                update.value.to_string(),
            ])
            .map_err(|e| CsvError::Csv(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| CsvError::Csv(e.to_string()))
}

/// `<name>_updates_export_<YYYYMMDD_HHMMSS>.csv` with spaces replaced by `_`.
pub fn export_filename(investment_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_updates_export_{}.csv",
        investment_name,
        at.format("%Y%m%d_%H%M%S")
    )
    .replace(' ', "_")
}

#[derive(Debug, Clone)]
pub struct InvestmentUpdateCsv {
    updates: Arc<InvestmentUpdateService>,
}

impl InvestmentUpdateCsv {
    pub fn new(updates: Arc<InvestmentUpdateService>) -> Self {
        Self { updates }
    }

    /// Parse every row, then write all updates as one batch through the
    /// ledger write path. Either every row is stored or none is.
    /// Returns the number of imported updates.
    pub async fn import(
        &self,
        investment_id: InvestmentId,
        csv_bytes: &[u8],
    ) -> Result<usize, CsvError> {
        let commands = parse_updates(investment_id, csv_bytes)?;
        let imported = self.updates.create_batch(&commands).await?;

        info!(investment_id = %investment_id, rows = imported, "CSV import completed");
        Ok(imported)
    }

    /// Export the investment's updates, newest first.
    pub async fn export(&self, investment: &Investment) -> Result<CsvExport, CsvError> {
        let updates = self.updates.find_by_investment_id(investment.id).await?;
        let body = write_updates(&updates)?;

        Ok(CsvExport {
            filename: export_filename(&investment.name, Utc::now()),
            body,
        })
    }
}
