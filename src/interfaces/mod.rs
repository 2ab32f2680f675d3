//! Abstract interfaces for the ledger's collaborators.
//!
//! These traits define the contracts for:
//! - Affiliate program persistence (clicks, conversions, payouts)
//! - Closer CRM persistence (closers, appointments)

pub mod ledger_store;
pub mod roster_store;

pub use ledger_store::{
    CommissionTransition, InsertOutcome, LedgerStore, PayoutTotals, Result, SettleResult,
    StorageError, TransitionResult,
};
pub use roster_store::RosterStore;
