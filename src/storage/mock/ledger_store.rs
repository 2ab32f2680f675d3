//! Mock LedgerStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::interfaces::{
    CommissionTransition, InsertOutcome, LedgerStore, PayoutTotals, Result, SettleResult,
    StorageError, TransitionResult,
};
use crate::model::{
    Affiliate, AffiliateClick, AffiliateConversion, AffiliateCounters, AffiliatePayout,
    CommissionStatus, ConversionStatus, ConversionType, PayoutStatus,
};
use crate::storage::helpers::{cents, distinct_ids};

/// Everything the mock holds. One lock guards it all, so every trait method
/// is a single critical section, like one SQLite transaction.
#[derive(Default)]
struct LedgerState {
    affiliates: HashMap<Uuid, Affiliate>,
    clicks: Vec<AffiliateClick>,
    conversions: Vec<AffiliateConversion>,
    payouts: HashMap<Uuid, AffiliatePayout>,
}

impl LedgerState {
    fn affiliate_mut(&mut self, id: Uuid) -> Result<&mut Affiliate> {
        self.affiliates.get_mut(&id).ok_or(StorageError::NotFound {
            kind: "affiliate",
            id: id.to_string(),
        })
    }

    fn conversion(&self, id: Uuid) -> Option<&AffiliateConversion> {
        self.conversions.iter().find(|c| c.id == id)
    }

    fn conversion_mut(&mut self, id: Uuid) -> Option<&mut AffiliateConversion> {
        self.conversions.iter_mut().find(|c| c.id == id)
    }
}

/// Mock ledger store that keeps rows in memory.
#[derive(Default)]
pub struct MockLedgerStore {
    state: RwLock<LedgerState>,
    fail_on_write: RwLock<bool>,
}

impl MockLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call fail with `StorageError::Unavailable`.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Number of stored clicks across all affiliates.
    pub async fn click_count(&self) -> usize {
        self.state.read().await.clicks.len()
    }

    async fn check_writable(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable("mock write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn insert_affiliate(&self, affiliate: &Affiliate) -> Result<()> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        let taken = state.affiliates.values().any(|a| {
            a.id == affiliate.id || a.referral_code == affiliate.referral_code
        });
        if taken {
            return Err(StorageError::AlreadyExists {
                kind: "affiliate",
                id: affiliate.referral_code.clone(),
            });
        }
        state.affiliates.insert(affiliate.id, affiliate.clone());
        Ok(())
    }

    async fn get_affiliate(&self, id: Uuid) -> Result<Option<Affiliate>> {
        Ok(self.state.read().await.affiliates.get(&id).cloned())
    }

    async fn find_affiliate_by_code(&self, referral_code: &str) -> Result<Option<Affiliate>> {
        let state = self.state.read().await;
        Ok(state
            .affiliates
            .values()
            .find(|a| a.referral_code == referral_code)
            .cloned())
    }

    async fn list_affiliates(&self) -> Result<Vec<Affiliate>> {
        let state = self.state.read().await;
        let mut affiliates: Vec<_> = state.affiliates.values().cloned().collect();
        affiliates.sort_by_key(|a| a.created_at);
        Ok(affiliates)
    }

    async fn insert_click(
        &self,
        click: &AffiliateClick,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        self.check_writable().await?;
        let mut state = self.state.write().await;

        let duplicate = state.clicks.iter().any(|c| {
            c.affiliate_id == click.affiliate_id
                && c.user_agent == click.user_agent
                && c.created_at >= dedupe_since
        });
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }

        state.affiliate_mut(click.affiliate_id)?.counters.total_clicks += 1;
        state.clicks.push(click.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn list_clicks(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateClick>> {
        let state = self.state.read().await;
        Ok(state
            .clicks
            .iter()
            .filter(|c| c.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }

    async fn insert_conversion(
        &self,
        conversion: &AffiliateConversion,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        self.check_writable().await?;
        cents(conversion.commission_amount)?;
        let mut state = self.state.write().await;

        let duplicate = state.conversions.iter().any(|c| {
            c.affiliate_id == conversion.affiliate_id
                && c.conversion_type == conversion.conversion_type
                && c.created_at >= dedupe_since
        });
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }

        let counters = &mut state.affiliate_mut(conversion.affiliate_id)?.counters;
        match conversion.conversion_type {
            ConversionType::QuizCompletion => counters.total_leads += 1,
            ConversionType::Booking => counters.total_bookings += 1,
            ConversionType::Sale => counters.total_sales += 1,
        }
        counters.total_commission += conversion.commission_amount;
        state.conversions.push(conversion.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn get_conversion(&self, id: Uuid) -> Result<Option<AffiliateConversion>> {
        Ok(self.state.read().await.conversion(id).cloned())
    }

    async fn list_conversions(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateConversion>> {
        let state = self.state.read().await;
        Ok(state
            .conversions
            .iter()
            .filter(|c| c.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }

    async fn release_due_commissions(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        self.check_writable().await?;
        let mut state = self.state.write().await;

        let mut released = Vec::new();
        for conversion in state.conversions.iter_mut() {
            if conversion.commission_status == CommissionStatus::Held && conversion.hold_until <= now
            {
                conversion.commission_status = CommissionStatus::Available;
                conversion.commission_updated_at = now;
                released.push(conversion.id);
            }
        }
        Ok(released)
    }

    async fn transition_commissions(
        &self,
        transition: &CommissionTransition,
    ) -> Result<TransitionResult> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        let ids = distinct_ids(&transition.ids);

        for id in &ids {
            let Some(conversion) = state.conversion(*id) else {
                return Ok(TransitionResult::Missing(*id));
            };
            if !transition.expected.contains(&conversion.commission_status) {
                return Ok(TransitionResult::Rejected {
                    id: *id,
                    current: conversion.commission_status,
                });
            }
        }

        for id in &ids {
            let Some(conversion) = state.conversion_mut(*id) else {
                continue;
            };
            conversion.commission_status = transition.target;
            conversion.commission_updated_at = transition.at;
            if transition.target == CommissionStatus::Forfeited {
                conversion.forfeit_reason = transition.reason.clone();
                let (affiliate_id, amount) = (conversion.affiliate_id, conversion.commission_amount);
                if let Some(affiliate) = state.affiliates.get_mut(&affiliate_id) {
                    affiliate.counters.total_commission -= amount;
                }
            }
        }
        Ok(TransitionResult::Applied(ids.len()))
    }

    async fn settle_commissions(
        &self,
        ids: &[Uuid],
        payout_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SettleResult> {
        self.check_writable().await?;
        let mut state = self.state.write().await;

        let Some(payout) = state.payouts.get(&payout_id).cloned() else {
            return Ok(SettleResult::PayoutMissing);
        };
        if payout.status != PayoutStatus::Completed {
            return Ok(SettleResult::PayoutNotCompleted(payout.status));
        }

        let ids = distinct_ids(ids);
        let mut requested = Decimal::ZERO;
        for id in &ids {
            let Some(conversion) = state.conversion(*id) else {
                return Ok(SettleResult::ConversionMissing(*id));
            };
            if conversion.affiliate_id != payout.affiliate_id {
                return Ok(SettleResult::AffiliateMismatch(*id));
            }
            if conversion.commission_status != CommissionStatus::Available {
                return Ok(SettleResult::NotAvailable {
                    id: *id,
                    current: conversion.commission_status,
                });
            }
            requested += conversion.commission_amount;
        }

        let already_settled: Decimal = state
            .conversions
            .iter()
            .filter(|c| c.payout_id == Some(payout_id))
            .map(|c| c.commission_amount)
            .sum();
        if already_settled + requested > payout.amount_due {
            return Ok(SettleResult::ExceedsPayout {
                already_settled,
                requested,
                amount_due: payout.amount_due,
            });
        }

        for id in &ids {
            if let Some(conversion) = state.conversion_mut(*id) {
                conversion.commission_status = CommissionStatus::Paid;
                conversion.payout_id = Some(payout_id);
                conversion.commission_updated_at = at;
            }
        }
        Ok(SettleResult::Applied(ids.len()))
    }

    async fn insert_payout(&self, payout: &AffiliatePayout) -> Result<()> {
        self.check_writable().await?;
        self.state
            .write()
            .await
            .payouts
            .insert(payout.id, payout.clone());
        Ok(())
    }

    async fn get_payout(&self, id: Uuid) -> Result<Option<AffiliatePayout>> {
        Ok(self.state.read().await.payouts.get(&id).cloned())
    }

    async fn list_payouts(&self, affiliate_id: Uuid) -> Result<Vec<AffiliatePayout>> {
        let state = self.state.read().await;
        let mut payouts: Vec<_> = state
            .payouts
            .values()
            .filter(|p| p.affiliate_id == affiliate_id)
            .cloned()
            .collect();
        payouts.sort_by_key(|p| p.created_at);
        Ok(payouts)
    }

    async fn update_payout_status(
        &self,
        id: Uuid,
        status: PayoutStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        let payout = state.payouts.get_mut(&id).ok_or(StorageError::NotFound {
            kind: "payout",
            id: id.to_string(),
        })?;
        payout.status = status;
        payout.paid_at = paid_at;
        Ok(())
    }

    async fn payout_totals(&self, affiliate_id: Uuid) -> Result<PayoutTotals> {
        let state = self.state.read().await;
        let mut totals = PayoutTotals::default();
        for payout in state.payouts.values().filter(|p| p.affiliate_id == affiliate_id) {
            match payout.status {
                PayoutStatus::Completed => totals.completed += payout.amount_due,
                PayoutStatus::Pending | PayoutStatus::Processing => {
                    totals.in_flight += payout.amount_due
                }
                PayoutStatus::Failed => {}
            }
        }
        Ok(totals)
    }

    async fn commission_total(&self, affiliate_id: Uuid) -> Result<Decimal> {
        let state = self.state.read().await;
        Ok(state
            .conversions
            .iter()
            .filter(|c| {
                c.affiliate_id == affiliate_id
                    && c.status != ConversionStatus::Cancelled
                    && c.commission_status != CommissionStatus::Forfeited
            })
            .map(|c| c.commission_amount)
            .sum())
    }

    async fn recount_affiliate(&self, id: Uuid) -> Result<AffiliateCounters> {
        let total_commission = self.commission_total(id).await?;
        let state = self.state.read().await;

        let count = |conversion_type: ConversionType| {
            state
                .conversions
                .iter()
                .filter(|c| {
                    c.affiliate_id == id
                        && c.conversion_type == conversion_type
                        && c.status != ConversionStatus::Cancelled
                })
                .count() as i64
        };

        Ok(AffiliateCounters {
            total_clicks: state.clicks.iter().filter(|c| c.affiliate_id == id).count() as i64,
            total_leads: count(ConversionType::QuizCompletion),
            total_bookings: count(ConversionType::Booking),
            total_sales: count(ConversionType::Sale),
            total_commission,
        })
    }

    async fn overwrite_affiliate_counters(
        &self,
        id: Uuid,
        counters: &AffiliateCounters,
    ) -> Result<()> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        state.affiliate_mut(id)?.counters = counters.clone();
        Ok(())
    }
}
