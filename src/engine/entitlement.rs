//! Subscription-tier capacity policy.
//!
//! The creation-time cap and the post-hoc locking on tier changes both rank
//! investments by creation order and both use
//! [`MAX_INVESTMENTS_FOR_BASIC_ACCOUNT`]; they are expressed here once.

use crate::domain::{AccountType, InvestmentId, InvestmentRecord};

/// Maximum number of unlocked investments on a basic account.
pub const MAX_INVESTMENTS_FOR_BASIC_ACCOUNT: usize = 2;

/// Number of unlocked investments the tier allows, `None` for unlimited.
pub fn investment_cap(account_type: AccountType) -> Option<usize> {
    match account_type {
        AccountType::Basic => Some(MAX_INVESTMENTS_FOR_BASIC_ACCOUNT),
        AccountType::Premium => None,
    }
}

/// Lock state the tier requires for the investment at `rank` (0-based,
/// oldest first). `None` means the tier leaves the current state alone.
pub fn required_lock_state(account_type: AccountType, rank: usize) -> Option<bool> {
    match investment_cap(account_type) {
        None => Some(false),
        Some(cap) if rank >= cap => Some(true),
        Some(_) => None,
    }
}

/// Whether a user holding `existing` investments may create another one.
pub fn can_create(account_type: AccountType, existing: usize) -> bool {
    required_lock_state(account_type, existing) != Some(true)
}

/// A single lock flag write required by a tier change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockChange {
    pub investment_id: InvestmentId,
    pub locked: bool,
}

/// Plan the lock flag writes that bring a user's investments in line with
/// `account_type`.
///
/// Investments are ranked by creation order regardless of input order.
/// Investments already in the required state produce no change, so applying
/// a plan twice is a no-op.
///
/// On a downgrade to basic only ranks at or beyond the cap are written
/// (locked). The oldest ranks inside the cap keep whatever lock state they
/// have, so an investment locked by an earlier downgrade stays locked after
/// an older one is deleted. Only an upgrade unlocks.
pub fn plan_lock_changes(
    account_type: AccountType,
    investments: &[InvestmentRecord],
) -> Vec<LockChange> {
    let mut ranked: Vec<&InvestmentRecord> = investments.iter().collect();
    ranked.sort_by_key(|i| i.creation_key());

    ranked
        .into_iter()
        .enumerate()
        .filter_map(
            |(rank, investment)| match required_lock_state(account_type, rank) {
                Some(locked) if locked != investment.locked => Some(LockChange {
                    investment_id: investment.id,
                    locked,
                }),
                _ => None,
            },
        )
        .collect()
}
