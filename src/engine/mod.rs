//! Pure computation engine(s) for deterministic ledger logic.

pub mod carry_forward;
pub mod cost_basis;
pub mod entitlement;

pub use carry_forward::{carry_forward, merge_window};
pub use cost_basis::{attach_costs, running_costs};
pub use entitlement::{
    can_create, investment_cap, plan_lock_changes, required_lock_state, LockChange,
    MAX_INVESTMENTS_FOR_BASIC_ACCOUNT,
};
