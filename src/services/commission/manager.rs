//! Commission lifecycle operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::lifecycle::{CommissionEvent, IllegalTransition};
use crate::clock::Clock;
use crate::interfaces::{CommissionTransition, LedgerStore, SettleResult, TransitionResult};
use crate::model::CommissionStatus;
use crate::services::LedgerError;

/// Conversions moved from held to available by one release pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    pub released: Vec<Uuid>,
}

impl ReleaseReport {
    pub fn count(&self) -> usize {
        self.released.len()
    }
}

/// Applies lifecycle events to stored commissions.
///
/// Every operation is all-or-nothing: a precondition failure on any
/// referenced conversion aborts the call with no row changed.
pub struct CommissionManager {
    ledger: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl CommissionManager {
    pub fn new(ledger: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// Release every held commission whose hold ended at or before `now`.
    ///
    /// Idempotent: a second pass with no new conversions releases nothing.
    pub async fn release_due(&self, now: DateTime<Utc>) -> Result<ReleaseReport, LedgerError> {
        let released = self.ledger.release_due_commissions(now).await?;
        if !released.is_empty() {
            info!(count = released.len(), %now, "Released held commissions");
        }
        Ok(ReleaseReport { released })
    }

    /// Release one held commission before its hold ends.
    pub async fn force_release(&self, conversion_id: Uuid) -> Result<(), LedgerError> {
        self.apply(CommissionEvent::ForceRelease, &[conversion_id], None)
            .await?;
        info!(%conversion_id, "Commission force-released");
        Ok(())
    }

    /// Settle available commissions against a completed payout.
    ///
    /// The payout must exist, be `completed`, belong to the same affiliate,
    /// and have room for the commissions on top of those it already settled.
    pub async fn mark_paid(
        &self,
        conversion_ids: &[Uuid],
        payout_id: Uuid,
    ) -> Result<usize, LedgerError> {
        if conversion_ids.is_empty() {
            return Err(LedgerError::invalid_state(
                "payout",
                payout_id,
                "no conversions to settle",
            ));
        }

        let result = self
            .ledger
            .settle_commissions(conversion_ids, payout_id, self.clock.now())
            .await?;

        match result {
            SettleResult::Applied(count) => {
                info!(%payout_id, count, "Commissions marked paid");
                Ok(count)
            }
            SettleResult::PayoutMissing => Err(LedgerError::not_found("payout", payout_id)),
            SettleResult::PayoutNotCompleted(status) => Err(LedgerError::invalid_state(
                "payout",
                payout_id,
                format!("payout is {status}, not completed"),
            )),
            SettleResult::ConversionMissing(id) => Err(LedgerError::not_found("conversion", id)),
            SettleResult::AffiliateMismatch(id) => Err(LedgerError::invalid_state(
                "conversion",
                id,
                format!("belongs to a different affiliate than payout {payout_id}"),
            )),
            SettleResult::NotAvailable { id, current } => Err(LedgerError::invalid_state(
                "conversion",
                id,
                rejection(current, CommissionEvent::Settle),
            )),
            SettleResult::ExceedsPayout {
                already_settled,
                requested,
                amount_due,
            } => {
                warn!(
                    %payout_id,
                    %already_settled,
                    %requested,
                    %amount_due,
                    "Settlement exceeds payout amount"
                );
                Err(LedgerError::invalid_state(
                    "payout",
                    payout_id,
                    format!(
                        "settling {requested} on top of {already_settled} exceeds amount due {amount_due}"
                    ),
                ))
            }
        }
    }

    /// Forfeit a held or available commission.
    pub async fn forfeit(&self, conversion_id: Uuid, reason: &str) -> Result<(), LedgerError> {
        self.apply(
            CommissionEvent::Forfeit,
            &[conversion_id],
            Some(reason.to_string()),
        )
        .await?;
        info!(%conversion_id, reason, "Commission forfeited");
        Ok(())
    }

    async fn apply(
        &self,
        event: CommissionEvent,
        ids: &[Uuid],
        reason: Option<String>,
    ) -> Result<usize, LedgerError> {
        let transition = CommissionTransition {
            ids: ids.to_vec(),
            expected: event.sources().to_vec(),
            target: event.target(),
            reason,
            at: self.clock.now(),
        };

        match self.ledger.transition_commissions(&transition).await? {
            TransitionResult::Applied(count) => Ok(count),
            TransitionResult::Missing(id) => Err(LedgerError::not_found("conversion", id)),
            TransitionResult::Rejected { id, current } => Err(LedgerError::invalid_state(
                "conversion",
                id,
                rejection(current, event),
            )),
        }
    }
}

fn rejection(current: CommissionStatus, event: CommissionEvent) -> String {
    current
        .apply(event)
        .err()
        .unwrap_or(IllegalTransition {
            from: current,
            event,
        })
        .to_string()
}
