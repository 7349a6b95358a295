use std::collections::HashMap;

use crate::domain::{InvestmentId, InvestmentUpdate, UpdateId, UpdateOrderingKey, UpdateRecord};

/// Compute the running cost basis of every record, partitioned by investment.
///
/// The cost of a record is the sum of `deposit - withdrawal` over all records
/// of the same investment up to and including it, in `(date, seq)` order.
/// Callers must pass the complete history of each investment they need costs
/// for; a truncated history yields truncated totals.
pub fn running_costs(records: &[UpdateRecord]) -> HashMap<UpdateId, i64> {
    let mut ordered: Vec<&UpdateRecord> = records.iter().collect();
    ordered.sort_by_key(|r| UpdateOrderingKey::from_record(r));

    let mut totals: HashMap<InvestmentId, i64> = HashMap::new();
    let mut costs = HashMap::with_capacity(records.len());
    for record in ordered {
        let total = totals.entry(record.investment_id).or_insert(0);
        *total += record.net_contribution();
        costs.insert(record.id, *total);
    }
    costs
}

/// Materialize records into updates with their cost attached, keeping input order.
pub fn attach_costs(records: &[UpdateRecord]) -> Vec<InvestmentUpdate> {
    let costs = running_costs(records);
    records
        .iter()
        .map(|r| r.with_cost(costs.get(&r.id).copied().unwrap_or(0)))
        .collect()
}
