//! Payout aggregation and counter reconciliation.

use std::sync::Arc;

use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::LedgerError;
use crate::config::ProgramConfig;
use crate::interfaces::{LedgerStore, RosterStore};
use crate::model::{AffiliateCounters, CloserStats, PayoutSchedule};

/// What one affiliate has earned, been paid, and can still be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSummary {
    pub affiliate_id: Uuid,
    /// Lifetime commission, excluding forfeited commissions and cancelled conversions.
    pub total_commission: Decimal,
    /// Sum of completed payouts.
    pub total_paid: Decimal,
    /// Sum of pending and processing payouts.
    pub pending_payouts: Decimal,
    /// Never negative.
    pub available_commission: Decimal,
    pub minimum_payout: Decimal,
    pub payout_schedule: PayoutSchedule,
    /// Available balance reaches the minimum payout.
    pub payout_eligible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramTotals {
    pub total_commission: Decimal,
    pub total_paid: Decimal,
    pub pending_payouts: Decimal,
    pub available_commission: Decimal,
    pub eligible_affiliates: usize,
}

/// Admin view over every affiliate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    pub affiliates: Vec<PayoutSummary>,
    pub totals: ProgramTotals,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Records recomputed.
    pub synced: usize,
    /// Records whose cached values had drifted.
    pub corrected: Vec<Uuid>,
}

/// Computes payout balances and rebuilds cached counters from source rows.
pub struct PayoutLedger {
    ledger: Arc<dyn LedgerStore>,
    roster: Arc<dyn RosterStore>,
    program: ProgramConfig,
}

impl PayoutLedger {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        roster: Arc<dyn RosterStore>,
        program: ProgramConfig,
    ) -> Self {
        Self {
            ledger,
            roster,
            program,
        }
    }

    pub async fn summary(&self, affiliate_id: Uuid) -> Result<PayoutSummary, LedgerError> {
        if self.ledger.get_affiliate(affiliate_id).await?.is_none() {
            return Err(LedgerError::not_found("affiliate", affiliate_id));
        }
        self.summarize(affiliate_id).await
    }

    pub async fn summary_all(&self) -> Result<ProgramSummary, LedgerError> {
        let affiliates = self.ledger.list_affiliates().await?;
        let summaries = try_join_all(affiliates.iter().map(|a| self.summarize(a.id))).await?;

        let mut totals = ProgramTotals::default();
        for summary in &summaries {
            totals.total_commission += summary.total_commission;
            totals.total_paid += summary.total_paid;
            totals.pending_payouts += summary.pending_payouts;
            totals.available_commission += summary.available_commission;
            if summary.payout_eligible {
                totals.eligible_affiliates += 1;
            }
        }

        Ok(ProgramSummary {
            affiliates: summaries,
            totals,
        })
    }

    async fn summarize(&self, affiliate_id: Uuid) -> Result<PayoutSummary, LedgerError> {
        let total_commission = self.ledger.commission_total(affiliate_id).await?;
        let payouts = self.ledger.payout_totals(affiliate_id).await?;

        // Clamped: a payout can land before the conversion it covers is counted.
        let available_commission =
            (total_commission - payouts.completed - payouts.in_flight).max(Decimal::ZERO);

        Ok(PayoutSummary {
            affiliate_id,
            total_commission,
            total_paid: payouts.completed,
            pending_payouts: payouts.in_flight,
            available_commission,
            minimum_payout: self.program.minimum_payout,
            payout_schedule: self.program.payout_schedule,
            payout_eligible: available_commission >= self.program.minimum_payout,
        })
    }

    /// Recompute one affiliate's cached counters from its rows.
    pub async fn sync_affiliate(&self, affiliate_id: Uuid) -> Result<AffiliateCounters, LedgerError> {
        let Some(affiliate) = self.ledger.get_affiliate(affiliate_id).await? else {
            return Err(LedgerError::not_found("affiliate", affiliate_id));
        };
        let counters = self.ledger.recount_affiliate(affiliate_id).await?;
        if counters != affiliate.counters {
            warn!(
                %affiliate_id,
                cached_clicks = affiliate.counters.total_clicks,
                actual_clicks = counters.total_clicks,
                cached_commission = %affiliate.counters.total_commission,
                actual_commission = %counters.total_commission,
                "Affiliate counters drifted"
            );
        }
        self.ledger
            .overwrite_affiliate_counters(affiliate_id, &counters)
            .await?;
        Ok(counters)
    }

    /// Recompute cached counters for every affiliate. Safe to repeat.
    pub async fn sync_affiliate_totals(&self) -> Result<SyncReport, LedgerError> {
        let affiliates = self.ledger.list_affiliates().await?;
        let mut report = SyncReport::default();

        for affiliate in affiliates {
            let counters = self.ledger.recount_affiliate(affiliate.id).await?;
            if counters != affiliate.counters {
                report.corrected.push(affiliate.id);
            }
            self.ledger
                .overwrite_affiliate_counters(affiliate.id, &counters)
                .await?;
            report.synced += 1;
        }

        info!(
            synced = report.synced,
            corrected = report.corrected.len(),
            "Affiliate counters synced"
        );
        Ok(report)
    }

    /// Recompute conversions, revenue and conversion rate for every closer.
    pub async fn sync_closer_stats(&self) -> Result<SyncReport, LedgerError> {
        let closers = self.roster.list_closers().await?;
        let mut report = SyncReport::default();

        for closer in closers {
            let stats: CloserStats = self.roster.recount_closer(closer.id).await?;
            if stats != closer.stats {
                report.corrected.push(closer.id);
            }
            self.roster.overwrite_closer_stats(closer.id, &stats).await?;
            report.synced += 1;
        }

        info!(
            synced = report.synced,
            corrected = report.corrected.len(),
            "Closer stats synced"
        );
        Ok(report)
    }
}
