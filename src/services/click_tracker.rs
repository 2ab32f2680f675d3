//! Click deduplication and recording.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::{resolve_affiliate, LedgerError, TrackOutcome};
use crate::clock::Clock;
use crate::config::TrackingConfig;
use crate::interfaces::{InsertOutcome, LedgerStore};
use crate::model::{AffiliateClick, ClickSource, UtmParams};
use crate::utils::retry::with_store_retry;

/// One tracked visit as the redirect handler sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRequest {
    pub affiliate_code: String,
    pub ip_address: String,
    pub user_agent: String,
    pub utm: UtmParams,
    pub source: ClickSource,
}

/// Records affiliate clicks, dropping repeats from the same visitor.
///
/// A visitor is approximated by `(affiliate, user agent)`; a second click
/// inside the source's dedup window records nothing.
pub struct ClickTracker {
    ledger: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    tracking: TrackingConfig,
}

impl ClickTracker {
    pub fn new(ledger: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, tracking: TrackingConfig) -> Self {
        Self {
            ledger,
            clock,
            tracking,
        }
    }

    pub async fn track(&self, request: &ClickRequest) -> Result<TrackOutcome, LedgerError> {
        let affiliate = match resolve_affiliate(self.ledger.as_ref(), &request.affiliate_code).await? {
            Ok(affiliate) => affiliate,
            Err(outcome) => return Ok(outcome),
        };

        if affiliate.custom_link.is_some() {
            debug!(affiliate_id = %affiliate.id, "Referral code tracking disabled by custom link");
            return Ok(TrackOutcome::SkippedDisabled);
        }

        let now = self.clock.now();
        let click = AffiliateClick {
            id: Uuid::new_v4(),
            affiliate_id: affiliate.id,
            referral_code: affiliate.referral_code.clone(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            utm: request.utm.clone(),
            source: request.source,
            created_at: now,
        };
        let dedupe_since = now - self.tracking.click_window(request.source);

        let outcome = with_store_retry("insert_click", || {
            self.ledger.insert_click(&click, dedupe_since)
        })
        .await?;

        match outcome {
            InsertOutcome::Inserted => {
                info!(
                    affiliate_id = %affiliate.id,
                    click_id = %click.id,
                    source = %request.source,
                    "Click recorded"
                );
                Ok(TrackOutcome::Recorded(click.id))
            }
            InsertOutcome::Duplicate => {
                debug!(affiliate_id = %affiliate.id, source = %request.source, "Duplicate click");
                Ok(TrackOutcome::SkippedDuplicate)
            }
        }
    }
}
