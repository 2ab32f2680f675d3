//! Mock storage implementations for testing.

mod ledger_store;
mod roster_store;

pub use ledger_store::MockLedgerStore;
pub use roster_store::MockRosterStore;

#[cfg(test)]
mod tests;
