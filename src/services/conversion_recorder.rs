//! Conversion recording and commission seeding.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use super::{resolve_affiliate, LedgerError, TrackOutcome};
use crate::clock::Clock;
use crate::config::{ProgramConfig, TrackingConfig};
use crate::interfaces::{InsertOutcome, LedgerStore};
use crate::model::money::commission_for;
use crate::model::{
    AffiliateConversion, CommissionStatus, ConversionStatus, ConversionType,
};
use crate::utils::retry::with_store_retry;

/// A qualifying action reported by the quiz, booking or checkout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub affiliate_code: String,
    pub conversion_type: ConversionType,
    pub quiz_session_id: Option<Uuid>,
    pub sale_value: Option<Decimal>,
}

/// Turns qualifying actions into held commissions.
pub struct ConversionRecorder {
    ledger: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    program: ProgramConfig,
    tracking: TrackingConfig,
}

impl ConversionRecorder {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        program: ProgramConfig,
        tracking: TrackingConfig,
    ) -> Self {
        Self {
            ledger,
            clock,
            program,
            tracking,
        }
    }

    pub async fn record(&self, request: &ConversionRequest) -> Result<TrackOutcome, LedgerError> {
        let affiliate = match resolve_affiliate(self.ledger.as_ref(), &request.affiliate_code).await? {
            Ok(affiliate) => affiliate,
            Err(outcome) => return Ok(outcome),
        };

        // Refund-style negative values never claw back through a new conversion.
        let commission_amount = match (request.conversion_type.earns_commission(), request.sale_value) {
            (true, Some(value)) if value > Decimal::ZERO => commission_for(affiliate.commission_rate, value),
            _ => Decimal::ZERO,
        };

        let now = self.clock.now();
        let conversion = AffiliateConversion {
            id: Uuid::new_v4(),
            affiliate_id: affiliate.id,
            quiz_session_id: request.quiz_session_id,
            conversion_type: request.conversion_type,
            status: ConversionStatus::Confirmed,
            commission_amount,
            sale_value: request.sale_value,
            commission_status: CommissionStatus::Held,
            hold_until: now + self.program.hold_period(),
            payout_id: None,
            forfeit_reason: None,
            commission_updated_at: now,
            created_at: now,
        };
        let dedupe_since = now - self.tracking.conversion_window();

        let outcome = with_store_retry("insert_conversion", || {
            self.ledger.insert_conversion(&conversion, dedupe_since)
        })
        .await?;

        match outcome {
            InsertOutcome::Inserted => {
                info!(
                    affiliate_id = %affiliate.id,
                    conversion_id = %conversion.id,
                    conversion_type = %conversion.conversion_type,
                    commission = %commission_amount,
                    hold_until = %conversion.hold_until,
                    "Conversion recorded"
                );
                Ok(TrackOutcome::Recorded(conversion.id))
            }
            InsertOutcome::Duplicate => {
                debug!(
                    affiliate_id = %affiliate.id,
                    conversion_type = %conversion.conversion_type,
                    "Duplicate conversion"
                );
                Ok(TrackOutcome::SkippedDuplicate)
            }
        }
    }
}
