//! Commission lifecycle.
//!
//! [`lifecycle`] defines which status changes are legal; [`CommissionManager`]
//! applies them to stored conversions.

pub mod lifecycle;
mod manager;

pub use lifecycle::{CommissionEvent, IllegalTransition};
pub use manager::{CommissionManager, ReleaseReport};
