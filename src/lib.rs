//! Affiliate Ledger - attribution, commission lifecycle and closer assignment
//!
//! Turns referral clicks and qualifying actions into deduplicated records,
//! holds the resulting commissions through a chargeback window before they
//! can be paid, and spreads booked calls across the sales closers.

pub mod clock;
pub mod config;
pub mod interfaces;
pub mod model;
pub mod services;
pub mod storage;
pub mod utils;
