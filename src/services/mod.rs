//! Ledger services.
//!
//! Each service owns one part of the program: attribution of clicks and
//! conversions, the commission lifecycle, payout aggregation, and closer
//! assignment. Services talk to storage only through the store traits.

pub mod click_tracker;
pub mod closer_assignment;
pub mod commission;
pub mod conversion_recorder;
pub mod payout_ledger;
pub mod sweeper;

pub use click_tracker::{ClickRequest, ClickTracker};
pub use closer_assignment::{
    plan, AssignOutcome, Assignment, AssignmentPlan, AssignmentReport, CloserScheduler,
};
pub use commission::{
    CommissionEvent, CommissionManager, IllegalTransition, ReleaseReport,
};
pub use conversion_recorder::{ConversionRecorder, ConversionRequest};
pub use payout_ledger::{PayoutLedger, PayoutSummary, ProgramSummary, ProgramTotals, SyncReport};
pub use sweeper::{CommissionSweeper, SweepReport};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::interfaces::{LedgerStore, StorageError};
use crate::model::Affiliate;

/// Errors surfaced by ledger services.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid state for {kind} {id}: {detail}")]
    InvalidState {
        kind: &'static str,
        id: String,
        detail: String,
    },

    #[error("No eligible closers")]
    NoEligibleClosers,

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),
}

impl LedgerError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_state(
        kind: &'static str,
        id: impl ToString,
        detail: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            kind,
            id: id.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result of a tracking call.
///
/// Tracking is driven by passive redirects and user-facing flows, so every
/// miss is a success with no effect. Store failures are the `Err` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum TrackOutcome {
    /// Row written; carries its id.
    Recorded(Uuid),
    /// Same fingerprint inside the dedup window.
    SkippedDuplicate,
    /// No affiliate with that referral code.
    SkippedNotFound,
    /// Affiliate deactivated.
    SkippedInactive,
    /// Referral-code tracking replaced by a custom link.
    SkippedDisabled,
}

impl TrackOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Look up an affiliate for tracking, or the outcome that ends the call.
pub(crate) async fn resolve_affiliate(
    ledger: &dyn LedgerStore,
    referral_code: &str,
) -> Result<Result<Affiliate, TrackOutcome>, LedgerError> {
    let Some(affiliate) = ledger.find_affiliate_by_code(referral_code).await? else {
        debug!(referral_code, "Unknown referral code");
        return Ok(Err(TrackOutcome::SkippedNotFound));
    };
    if !affiliate.is_active {
        debug!(affiliate_id = %affiliate.id, "Affiliate inactive");
        return Ok(Err(TrackOutcome::SkippedInactive));
    }
    Ok(Ok(affiliate))
}
