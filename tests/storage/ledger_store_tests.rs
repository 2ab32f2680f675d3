//! LedgerStore interface tests.
//!
//! These tests verify the contract of the LedgerStore trait.
//! Each storage implementation should run these tests. All tests share one
//! store, so each creates its own affiliate.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use affiliate_ledger::interfaces::{
    CommissionTransition, InsertOutcome, LedgerStore, SettleResult, StorageError,
    TransitionResult,
};
use affiliate_ledger::model::{
    Affiliate, AffiliateClick, AffiliateConversion, AffiliateCounters, AffiliatePayout,
    AffiliateTier, ClickSource, CommissionStatus, ConversionStatus, ConversionType, PayoutStatus,
    UtmParams,
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

/// Insert a fresh bronze affiliate with a unique referral code.
pub async fn make_affiliate<S: LedgerStore>(store: &S) -> Affiliate {
    let code = format!("T{}", &Uuid::new_v4().simple().to_string()[..10]);
    let affiliate = Affiliate::new(
        "Test Affiliate",
        "affiliate@example.com",
        code,
        AffiliateTier::Bronze,
        dec!(0.10),
        base_time(),
    );
    store
        .insert_affiliate(&affiliate)
        .await
        .expect("insert_affiliate should succeed");
    affiliate
}

pub fn make_click(affiliate: &Affiliate, user_agent: &str, at: DateTime<Utc>) -> AffiliateClick {
    AffiliateClick {
        id: Uuid::new_v4(),
        affiliate_id: affiliate.id,
        referral_code: affiliate.referral_code.clone(),
        ip_address: "198.51.100.4".to_string(),
        user_agent: user_agent.to_string(),
        utm: UtmParams {
            source: Some("blog".to_string()),
            medium: Some("cpc".to_string()),
            campaign: None,
        },
        source: ClickSource::Redirect,
        created_at: at,
    }
}

pub fn make_conversion(
    affiliate: &Affiliate,
    conversion_type: ConversionType,
    commission: Decimal,
    at: DateTime<Utc>,
) -> AffiliateConversion {
    AffiliateConversion {
        id: Uuid::new_v4(),
        affiliate_id: affiliate.id,
        quiz_session_id: Some(Uuid::new_v4()),
        conversion_type,
        status: ConversionStatus::Confirmed,
        commission_amount: commission,
        sale_value: Some(commission * dec!(10)),
        commission_status: CommissionStatus::Held,
        hold_until: at + Duration::days(30),
        payout_id: None,
        forfeit_reason: None,
        commission_updated_at: at,
        created_at: at,
    }
}

/// Insert a held conversion with no dedup window.
pub async fn seed_conversion<S: LedgerStore>(
    store: &S,
    affiliate: &Affiliate,
    conversion_type: ConversionType,
    commission: Decimal,
    at: DateTime<Utc>,
) -> AffiliateConversion {
    let conversion = make_conversion(affiliate, conversion_type, commission, at);
    let outcome = store
        .insert_conversion(&conversion, at + Duration::microseconds(1))
        .await
        .expect("insert_conversion should succeed");
    assert_eq!(outcome, InsertOutcome::Inserted);
    conversion
}

async fn commission_status<S: LedgerStore>(store: &S, id: Uuid) -> CommissionStatus {
    store
        .get_conversion(id)
        .await
        .expect("get_conversion should succeed")
        .expect("conversion should exist")
        .commission_status
}

fn transition(ids: Vec<Uuid>, expected: &[CommissionStatus], target: CommissionStatus) -> CommissionTransition {
    CommissionTransition {
        ids,
        expected: expected.to_vec(),
        target,
        reason: None,
        at: base_time() + Duration::days(1),
    }
}

async fn completed_payout<S: LedgerStore>(store: &S, affiliate: &Affiliate, amount: Decimal) -> AffiliatePayout {
    let mut payout = AffiliatePayout::new(affiliate.id, amount, base_time());
    payout.status = PayoutStatus::Completed;
    payout.paid_at = Some(base_time() + Duration::days(40));
    store.insert_payout(&payout).await.expect("insert_payout should succeed");
    payout
}

// =============================================================================
// Affiliates
// =============================================================================

pub async fn test_affiliate_round_trip<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;

    let fetched = store
        .get_affiliate(affiliate.id)
        .await
        .expect("get_affiliate should succeed")
        .expect("affiliate should exist");
    assert_eq!(fetched, affiliate);

    let by_code = store
        .find_affiliate_by_code(&affiliate.referral_code)
        .await
        .expect("find should succeed")
        .expect("affiliate should be found by code");
    assert_eq!(by_code.id, affiliate.id);

    assert!(store
        .find_affiliate_by_code("no-such-code")
        .await
        .expect("find should succeed")
        .is_none());

    let listed = store.list_affiliates().await.expect("list should succeed");
    assert!(listed.iter().any(|a| a.id == affiliate.id));
}

pub async fn test_duplicate_referral_code_rejected<S: LedgerStore>(store: &S) {
    let original = make_affiliate(store).await;
    let imposter = Affiliate::new(
        "Imposter",
        "imposter@example.com",
        original.referral_code.clone(),
        AffiliateTier::Gold,
        dec!(0.20),
        base_time(),
    );

    let err = store.insert_affiliate(&imposter).await.unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists { kind: "affiliate", .. }));

    let by_code = store
        .find_affiliate_by_code(&original.referral_code)
        .await
        .unwrap()
        .expect("original should still own the code");
    assert_eq!(by_code.id, original.id);
    assert!(store.get_affiliate(imposter.id).await.unwrap().is_none());
}

// =============================================================================
// Clicks
// =============================================================================

pub async fn test_click_dedup_window<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();
    let window = Duration::hours(1);

    let first = make_click(&affiliate, "Mozilla/5.0", t0);
    assert_eq!(
        store.insert_click(&first, t0 - window).await.unwrap(),
        InsertOutcome::Inserted
    );

    let at = t0 + Duration::minutes(30);
    let repeat = make_click(&affiliate, "Mozilla/5.0", at);
    assert_eq!(
        store.insert_click(&repeat, at - window).await.unwrap(),
        InsertOutcome::Duplicate
    );

    let at = t0 + Duration::minutes(61);
    let later = make_click(&affiliate, "Mozilla/5.0", at);
    assert_eq!(
        store.insert_click(&later, at - window).await.unwrap(),
        InsertOutcome::Inserted
    );

    let clicks = store.list_clicks(affiliate.id).await.unwrap();
    assert_eq!(clicks.len(), 2);
    assert_eq!(clicks[0], first);

    let fetched = store.get_affiliate(affiliate.id).await.unwrap().unwrap();
    assert_eq!(fetched.counters.total_clicks, 2);
}

pub async fn test_click_fingerprint_is_affiliate_and_user_agent<S: LedgerStore>(store: &S) {
    let a = make_affiliate(store).await;
    let b = make_affiliate(store).await;
    let t0 = base_time();
    let since = t0 - Duration::hours(1);

    assert_eq!(store.insert_click(&make_click(&a, "ua-1", t0), since).await.unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.insert_click(&make_click(&a, "ua-2", t0), since).await.unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.insert_click(&make_click(&b, "ua-1", t0), since).await.unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.insert_click(&make_click(&a, "ua-1", t0), since).await.unwrap(), InsertOutcome::Duplicate);

    assert_eq!(store.list_clicks(a.id).await.unwrap().len(), 2);
    assert_eq!(store.list_clicks(b.id).await.unwrap().len(), 1);
}

// =============================================================================
// Conversions
// =============================================================================

pub async fn test_conversion_dedup_and_counters<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();
    let window = Duration::seconds(30);

    let sale = make_conversion(&affiliate, ConversionType::Sale, dec!(25.50), t0);
    assert_eq!(store.insert_conversion(&sale, t0 - window).await.unwrap(), InsertOutcome::Inserted);

    let at = t0 + Duration::seconds(5);
    let retry = make_conversion(&affiliate, ConversionType::Sale, dec!(25.50), at);
    assert_eq!(store.insert_conversion(&retry, at - window).await.unwrap(), InsertOutcome::Duplicate);

    let lead = make_conversion(&affiliate, ConversionType::QuizCompletion, dec!(1.25), at);
    assert_eq!(store.insert_conversion(&lead, at - window).await.unwrap(), InsertOutcome::Inserted);

    let booking = make_conversion(&affiliate, ConversionType::Booking, Decimal::ZERO, at);
    assert_eq!(store.insert_conversion(&booking, at - window).await.unwrap(), InsertOutcome::Inserted);

    let fetched = store.get_conversion(sale.id).await.unwrap().expect("sale should exist");
    assert_eq!(fetched, sale);

    let affiliate = store.get_affiliate(affiliate.id).await.unwrap().unwrap();
    assert_eq!(
        affiliate.counters,
        AffiliateCounters {
            total_clicks: 0,
            total_leads: 1,
            total_bookings: 1,
            total_sales: 1,
            total_commission: dec!(26.75),
        }
    );
    assert_eq!(store.list_conversions(affiliate.id).await.unwrap().len(), 3);
}

// =============================================================================
// Commission transitions
// =============================================================================

pub async fn test_release_due_is_idempotent<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let conversion = seed_conversion(store, &affiliate, ConversionType::Sale, dec!(10), base_time()).await;

    let not_yet = store
        .release_due_commissions(conversion.hold_until - Duration::seconds(1))
        .await
        .unwrap();
    assert!(!not_yet.contains(&conversion.id));

    let now = conversion.hold_until + Duration::days(1);
    let first = store.release_due_commissions(now).await.unwrap();
    assert!(first.contains(&conversion.id));
    let second = store.release_due_commissions(now).await.unwrap();
    assert!(!second.contains(&conversion.id));

    let fetched = store.get_conversion(conversion.id).await.unwrap().unwrap();
    assert_eq!(fetched.commission_status, CommissionStatus::Available);
    assert_eq!(fetched.hold_until, conversion.hold_until);
    assert_eq!(fetched.commission_updated_at, now);
}

pub async fn test_transition_is_all_or_nothing<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();
    let held = seed_conversion(store, &affiliate, ConversionType::Sale, dec!(10), t0).await;
    let released = seed_conversion(store, &affiliate, ConversionType::QuizCompletion, dec!(5), t0).await;

    let result = store
        .transition_commissions(&transition(vec![released.id], &[CommissionStatus::Held], CommissionStatus::Available))
        .await
        .unwrap();
    assert_eq!(result, TransitionResult::Applied(1));

    let result = store
        .transition_commissions(&transition(
            vec![held.id, released.id],
            &[CommissionStatus::Held],
            CommissionStatus::Available,
        ))
        .await
        .unwrap();
    assert_eq!(
        result,
        TransitionResult::Rejected {
            id: released.id,
            current: CommissionStatus::Available,
        }
    );
    assert_eq!(commission_status(store, held.id).await, CommissionStatus::Held);

    let missing = Uuid::new_v4();
    let result = store
        .transition_commissions(&transition(vec![held.id, missing], &[CommissionStatus::Held], CommissionStatus::Available))
        .await
        .unwrap();
    assert_eq!(result, TransitionResult::Missing(missing));
    assert_eq!(commission_status(store, held.id).await, CommissionStatus::Held);
}

pub async fn test_forfeit_updates_commission_total<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();
    let kept = seed_conversion(store, &affiliate, ConversionType::Sale, dec!(40), t0).await;
    let lost = seed_conversion(store, &affiliate, ConversionType::QuizCompletion, dec!(15), t0).await;

    let mut forfeit = transition(
        vec![lost.id],
        &[CommissionStatus::Held, CommissionStatus::Available],
        CommissionStatus::Forfeited,
    );
    forfeit.reason = Some("chargeback".to_string());
    assert_eq!(store.transition_commissions(&forfeit).await.unwrap(), TransitionResult::Applied(1));

    let fetched = store.get_conversion(lost.id).await.unwrap().unwrap();
    assert_eq!(fetched.commission_status, CommissionStatus::Forfeited);
    assert_eq!(fetched.forfeit_reason.as_deref(), Some("chargeback"));

    assert_eq!(store.commission_total(affiliate.id).await.unwrap(), kept.commission_amount);
    let cached = store.get_affiliate(affiliate.id).await.unwrap().unwrap();
    assert_eq!(cached.counters.total_commission, dec!(40));

    // A release pass must not resurrect it.
    store
        .release_due_commissions(t0 + Duration::days(365))
        .await
        .unwrap();
    assert_eq!(commission_status(store, lost.id).await, CommissionStatus::Forfeited);
}

pub async fn test_cancelled_conversion_excluded_from_totals<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();
    seed_conversion(store, &affiliate, ConversionType::Sale, dec!(40), t0).await;

    let mut cancelled = make_conversion(&affiliate, ConversionType::Sale, dec!(25), t0);
    cancelled.status = ConversionStatus::Cancelled;
    assert_eq!(
        store
            .insert_conversion(&cancelled, t0 + Duration::microseconds(1))
            .await
            .unwrap(),
        InsertOutcome::Inserted
    );

    assert_eq!(store.commission_total(affiliate.id).await.unwrap(), dec!(40));
    let recounted = store.recount_affiliate(affiliate.id).await.unwrap();
    assert_eq!(recounted.total_sales, 1);
    assert_eq!(recounted.total_commission, dec!(40));
}

// =============================================================================
// Settlement
// =============================================================================

pub async fn test_settle_against_completed_payout<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();
    let a = seed_conversion(store, &affiliate, ConversionType::Sale, dec!(60), t0).await;
    let b = seed_conversion(store, &affiliate, ConversionType::QuizCompletion, dec!(30), t0).await;
    store
        .transition_commissions(&transition(vec![a.id, b.id], &[CommissionStatus::Held], CommissionStatus::Available))
        .await
        .unwrap();

    let pending = AffiliatePayout::new(affiliate.id, dec!(90), t0);
    store.insert_payout(&pending).await.unwrap();
    let at = t0 + Duration::days(40);
    assert_eq!(
        store.settle_commissions(&[a.id], pending.id, at).await.unwrap(),
        SettleResult::PayoutNotCompleted(PayoutStatus::Pending)
    );
    assert_eq!(
        store.settle_commissions(&[a.id], Uuid::new_v4(), at).await.unwrap(),
        SettleResult::PayoutMissing
    );

    let payout = completed_payout(store, &affiliate, dec!(80)).await;
    assert_eq!(
        store.settle_commissions(&[a.id, b.id], payout.id, at).await.unwrap(),
        SettleResult::ExceedsPayout {
            already_settled: Decimal::ZERO,
            requested: dec!(90),
            amount_due: dec!(80),
        }
    );
    assert_eq!(commission_status(store, a.id).await, CommissionStatus::Available);

    assert_eq!(
        store.settle_commissions(&[a.id, a.id], payout.id, at).await.unwrap(),
        SettleResult::Applied(1)
    );
    let settled = store.get_conversion(a.id).await.unwrap().unwrap();
    assert_eq!(settled.commission_status, CommissionStatus::Paid);
    assert_eq!(settled.payout_id, Some(payout.id));

    assert_eq!(
        store.settle_commissions(&[a.id], payout.id, at).await.unwrap(),
        SettleResult::NotAvailable {
            id: a.id,
            current: CommissionStatus::Paid,
        }
    );
    assert_eq!(
        store.settle_commissions(&[b.id], payout.id, at).await.unwrap(),
        SettleResult::ExceedsPayout {
            already_settled: dec!(60),
            requested: dec!(30),
            amount_due: dec!(80),
        }
    );
}

pub async fn test_settle_rejects_other_affiliates_commission<S: LedgerStore>(store: &S) {
    let owner = make_affiliate(store).await;
    let other = make_affiliate(store).await;
    let t0 = base_time();
    let conversion = seed_conversion(store, &other, ConversionType::Sale, dec!(20), t0).await;
    store
        .transition_commissions(&transition(vec![conversion.id], &[CommissionStatus::Held], CommissionStatus::Available))
        .await
        .unwrap();

    let payout = completed_payout(store, &owner, dec!(20)).await;
    assert_eq!(
        store.settle_commissions(&[conversion.id], payout.id, t0).await.unwrap(),
        SettleResult::AffiliateMismatch(conversion.id)
    );
}

// =============================================================================
// Payouts and aggregates
// =============================================================================

pub async fn test_payout_totals<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();

    for (amount, status) in [
        (dec!(100), PayoutStatus::Completed),
        (dec!(25.25), PayoutStatus::Completed),
        (dec!(10), PayoutStatus::Pending),
        (dec!(5), PayoutStatus::Processing),
        (dec!(999), PayoutStatus::Failed),
    ] {
        let mut payout = AffiliatePayout::new(affiliate.id, amount, t0);
        payout.status = status;
        store.insert_payout(&payout).await.unwrap();
    }

    let totals = store.payout_totals(affiliate.id).await.unwrap();
    assert_eq!(totals.completed, dec!(125.25));
    assert_eq!(totals.in_flight, dec!(15));
    assert_eq!(store.list_payouts(affiliate.id).await.unwrap().len(), 5);
}

pub async fn test_update_payout_status<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let payout = AffiliatePayout::new(affiliate.id, dec!(50), base_time());
    store.insert_payout(&payout).await.unwrap();

    let paid_at = base_time() + Duration::days(3);
    store
        .update_payout_status(payout.id, PayoutStatus::Completed, Some(paid_at))
        .await
        .unwrap();
    let fetched = store.get_payout(payout.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, PayoutStatus::Completed);
    assert_eq!(fetched.paid_at, Some(paid_at));

    let err = store
        .update_payout_status(Uuid::new_v4(), PayoutStatus::Failed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { kind: "payout", .. }));
}

pub async fn test_recount_restores_corrupted_counters<S: LedgerStore>(store: &S) {
    let affiliate = make_affiliate(store).await;
    let t0 = base_time();
    for i in 0..4 {
        let click = make_click(&affiliate, &format!("agent-{i}"), t0);
        store.insert_click(&click, t0).await.unwrap();
    }
    seed_conversion(store, &affiliate, ConversionType::Sale, dec!(12.34), t0).await;
    seed_conversion(store, &affiliate, ConversionType::Booking, Decimal::ZERO, t0).await;

    let expected = store.recount_affiliate(affiliate.id).await.unwrap();
    assert_eq!(
        expected,
        AffiliateCounters {
            total_clicks: 4,
            total_leads: 0,
            total_bookings: 1,
            total_sales: 1,
            total_commission: dec!(12.34),
        }
    );

    let corrupted = AffiliateCounters {
        total_clicks: 77,
        total_leads: 3,
        total_bookings: 0,
        total_sales: 9,
        total_commission: dec!(1000),
    };
    store.overwrite_affiliate_counters(affiliate.id, &corrupted).await.unwrap();
    assert_eq!(store.get_affiliate(affiliate.id).await.unwrap().unwrap().counters, corrupted);

    let recounted = store.recount_affiliate(affiliate.id).await.unwrap();
    store.overwrite_affiliate_counters(affiliate.id, &recounted).await.unwrap();
    assert_eq!(store.get_affiliate(affiliate.id).await.unwrap().unwrap().counters, expected);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all LedgerStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_ledger_store_tests {
    ($store:expr) => {
        use $crate::storage::ledger_store_tests::*;

        test_affiliate_round_trip($store).await;
        println!("  test_affiliate_round_trip: PASSED");

        test_duplicate_referral_code_rejected($store).await;
        println!("  test_duplicate_referral_code_rejected: PASSED");

        // clicks
        test_click_dedup_window($store).await;
        println!("  test_click_dedup_window: PASSED");

        test_click_fingerprint_is_affiliate_and_user_agent($store).await;
        println!("  test_click_fingerprint_is_affiliate_and_user_agent: PASSED");

        // conversions
        test_conversion_dedup_and_counters($store).await;
        println!("  test_conversion_dedup_and_counters: PASSED");

        // commission transitions
        test_release_due_is_idempotent($store).await;
        println!("  test_release_due_is_idempotent: PASSED");

        test_transition_is_all_or_nothing($store).await;
        println!("  test_transition_is_all_or_nothing: PASSED");

        test_forfeit_updates_commission_total($store).await;
        println!("  test_forfeit_updates_commission_total: PASSED");

        test_cancelled_conversion_excluded_from_totals($store).await;
        println!("  test_cancelled_conversion_excluded_from_totals: PASSED");

        // settlement
        test_settle_against_completed_payout($store).await;
        println!("  test_settle_against_completed_payout: PASSED");

        test_settle_rejects_other_affiliates_commission($store).await;
        println!("  test_settle_rejects_other_affiliates_commission: PASSED");

        // payouts and aggregates
        test_payout_totals($store).await;
        println!("  test_payout_totals: PASSED");

        test_update_payout_status($store).await;
        println!("  test_update_payout_status: PASSED");

        test_recount_restores_corrupted_counters($store).await;
        println!("  test_recount_restores_corrupted_counters: PASSED");
    };
}
