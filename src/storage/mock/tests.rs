use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::interfaces::{
    CommissionTransition, InsertOutcome, LedgerStore, RosterStore, StorageError, TransitionResult,
};
use crate::model::{
    Affiliate, AffiliateClick, AffiliateTier, Appointment, ClickSource, Closer, CommissionStatus,
    UtmParams,
};

use super::*;

fn click(affiliate: &Affiliate, user_agent: &str, at: chrono::DateTime<Utc>) -> AffiliateClick {
    AffiliateClick {
        id: Uuid::new_v4(),
        affiliate_id: affiliate.id,
        referral_code: affiliate.referral_code.clone(),
        ip_address: "10.0.0.1".to_string(),
        user_agent: user_agent.to_string(),
        utm: UtmParams::default(),
        source: ClickSource::Redirect,
        created_at: at,
    }
}

#[tokio::test]
async fn test_mock_click_dedup_respects_window_start() {
    let store = MockLedgerStore::new();
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let affiliate = Affiliate::new("A", "a@x.io", "A1", AffiliateTier::Bronze, dec!(0.10), t0);
    store.insert_affiliate(&affiliate).await.unwrap();

    let first = click(&affiliate, "ua", t0);
    assert_eq!(
        store.insert_click(&first, t0 - Duration::hours(1)).await.unwrap(),
        InsertOutcome::Inserted
    );

    let again = click(&affiliate, "ua", t0 + Duration::minutes(10));
    assert_eq!(
        store.insert_click(&again, t0 - Duration::minutes(50)).await.unwrap(),
        InsertOutcome::Duplicate
    );

    let later = click(&affiliate, "ua", t0 + Duration::hours(2));
    assert_eq!(
        store.insert_click(&later, t0 + Duration::hours(1)).await.unwrap(),
        InsertOutcome::Inserted
    );

    let stored = store.get_affiliate(affiliate.id).await.unwrap().unwrap();
    assert_eq!(stored.counters.total_clicks, 2);
    assert_eq!(store.click_count().await, 2);
}

#[tokio::test]
async fn test_mock_write_failure_injection() {
    let store = MockLedgerStore::new();
    store.set_fail_on_write(true).await;

    let affiliate = Affiliate::new("A", "a@x.io", "A1", AffiliateTier::Bronze, dec!(0.10), Utc::now());
    let err = store.insert_affiliate(&affiliate).await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));

    store.set_fail_on_write(false).await;
    store.insert_affiliate(&affiliate).await.unwrap();
}

#[tokio::test]
async fn test_mock_transition_missing_conversion() {
    let store = MockLedgerStore::new();
    let id = Uuid::new_v4();
    let result = store
        .transition_commissions(&CommissionTransition {
            ids: vec![id],
            expected: vec![CommissionStatus::Held],
            target: CommissionStatus::Available,
            reason: None,
            at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(result, TransitionResult::Missing(id));
}

#[tokio::test]
async fn test_mock_assignment_requires_unassigned_appointment() {
    let store = MockRosterStore::new();
    let now = Utc::now();
    let closer = Closer::new("C", "c@x.io", now);
    let other = Closer::new("D", "d@x.io", now);
    store.insert_closer(&closer).await.unwrap();
    store.insert_closer(&other).await.unwrap();

    let appointment = Appointment::new("Cust", "cust@x.io", now + Duration::days(1), now);
    store.insert_appointment(&appointment).await.unwrap();

    assert!(store.apply_assignment(appointment.id, closer.id).await.unwrap());
    assert!(!store.apply_assignment(appointment.id, other.id).await.unwrap());

    let stored = store.get_closer(closer.id).await.unwrap().unwrap();
    assert_eq!(stored.total_calls, 1);
    let stored = store.get_closer(other.id).await.unwrap().unwrap();
    assert_eq!(stored.total_calls, 0);
}

#[tokio::test]
async fn test_mock_force_assign_hides_appointment() {
    let store = MockRosterStore::new();
    let now = Utc::now();
    let closer = Closer::new("C", "c@x.io", now);
    store.insert_closer(&closer).await.unwrap();
    let appointment = Appointment::new("Cust", "cust@x.io", now, now);
    store.insert_appointment(&appointment).await.unwrap();

    store.force_assign(appointment.id, closer.id).await;
    assert!(store.list_unassigned_appointments().await.unwrap().is_empty());
}
