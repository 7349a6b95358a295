//! Stable update ordering for deterministic processing.

use chrono::NaiveDate;

use crate::domain::UpdateRecord;

/// Stable ordering key for stored updates.
///
/// Updates are ordered by date; updates on the same date keep insertion
/// order (`seq`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UpdateOrderingKey {
    /// Calendar day (primary sort).
    pub date: NaiveDate,
    /// Store insertion sequence (tie-breaker).
    pub seq: i64,
}

impl UpdateOrderingKey {
    pub fn from_record(record: &UpdateRecord) -> Self {
        UpdateOrderingKey {
            date: record.date,
            seq: record.seq,
        }
    }
}

/// Sort stored updates deterministically, oldest first.
pub fn sort_records_deterministic(records: &mut [UpdateRecord]) {
    records.sort_by_key(UpdateOrderingKey::from_record);
}
