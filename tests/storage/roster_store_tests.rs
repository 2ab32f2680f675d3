//! RosterStore interface tests.
//!
//! These tests verify the contract of the RosterStore trait.
//! Each storage implementation should run these tests. The store is shared,
//! so list assertions only look at rows the test created.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use affiliate_ledger::interfaces::{RosterStore, StorageError};
use affiliate_ledger::model::{
    Appointment, AppointmentOutcome, AppointmentStatus, Closer, CloserStats,
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()
}

pub async fn make_closer<S: RosterStore>(store: &S, name: &str, created_at: DateTime<Utc>) -> Closer {
    let closer = Closer::new(name, format!("{}@example.com", name.to_lowercase()), created_at);
    store
        .insert_closer(&closer)
        .await
        .expect("insert_closer should succeed");
    closer
}

pub async fn make_appointment<S: RosterStore>(store: &S, scheduled_at: DateTime<Utc>) -> Appointment {
    let appointment = Appointment::new("Customer", "customer@example.com", scheduled_at, base_time());
    store
        .insert_appointment(&appointment)
        .await
        .expect("insert_appointment should succeed");
    appointment
}

fn only(ids: &[Uuid], closers: Vec<Closer>) -> Vec<Uuid> {
    closers
        .into_iter()
        .map(|c| c.id)
        .filter(|id| ids.contains(id))
        .collect()
}

// =============================================================================
// Closers
// =============================================================================

pub async fn test_closer_round_trip<S: RosterStore>(store: &S) {
    let mut closer = Closer::new("Rita", "rita@example.com", base_time());
    closer.total_calls = 4;
    closer.stats = CloserStats::from_counts(1, dec!(750.00), 3);
    store.insert_closer(&closer).await.unwrap();

    let fetched = store
        .get_closer(closer.id)
        .await
        .expect("get_closer should succeed")
        .expect("closer should exist");
    assert_eq!(fetched, closer);
    assert_eq!(fetched.stats.conversion_rate, dec!(33.33));

    assert!(store.get_closer(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store
        .list_closers()
        .await
        .unwrap()
        .iter()
        .any(|c| c.id == closer.id));
}

pub async fn test_eligible_closers_order_and_filter<S: RosterStore>(store: &S) {
    let t0 = base_time();
    let mut busy = Closer::new("Busy", "busy@example.com", t0);
    busy.total_calls = 5;
    store.insert_closer(&busy).await.unwrap();
    let older = make_closer(store, "Older", t0 + Duration::minutes(1)).await;
    let newer = make_closer(store, "Newer", t0 + Duration::minutes(2)).await;

    let mut inactive = Closer::new("Gone", "gone@example.com", t0);
    inactive.is_active = false;
    store.insert_closer(&inactive).await.unwrap();
    let mut unapproved = Closer::new("Pending", "pending@example.com", t0);
    unapproved.is_approved = false;
    store.insert_closer(&unapproved).await.unwrap();

    let ids = [busy.id, older.id, newer.id, inactive.id, unapproved.id];
    let eligible = only(&ids, store.list_eligible_closers().await.unwrap());
    assert_eq!(eligible, vec![older.id, newer.id, busy.id]);
}

pub async fn test_delete_closer_clears_appointments<S: RosterStore>(store: &S) {
    let closer = make_closer(store, "Leaving", base_time()).await;
    let appointment = make_appointment(store, base_time() + Duration::days(1)).await;
    assert!(store.apply_assignment(appointment.id, closer.id).await.unwrap());

    store.delete_closer(closer.id).await.unwrap();
    assert!(store.get_closer(closer.id).await.unwrap().is_none());
    let fetched = store.get_appointment(appointment.id).await.unwrap().unwrap();
    assert_eq!(fetched.closer_id, None);

    let err = store.delete_closer(closer.id).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { kind: "closer", .. }));
}

// =============================================================================
// Appointments
// =============================================================================

pub async fn test_unassigned_appointments_order<S: RosterStore>(store: &S) {
    let t0 = base_time();
    let late = make_appointment(store, t0 + Duration::days(3)).await;
    let early = make_appointment(store, t0 + Duration::days(1)).await;

    let mut cancelled = Appointment::new("C", "c@example.com", t0, t0);
    cancelled.status = AppointmentStatus::Cancelled;
    store.insert_appointment(&cancelled).await.unwrap();

    let owner = make_closer(store, "Owner", t0).await;
    let mut taken = Appointment::new("T", "t@example.com", t0, t0);
    taken.closer_id = Some(owner.id);
    store.insert_appointment(&taken).await.unwrap();

    let ids = [late.id, early.id, cancelled.id, taken.id];
    let unassigned: Vec<Uuid> = store
        .list_unassigned_appointments()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .filter(|id| ids.contains(id))
        .collect();
    assert_eq!(unassigned, vec![early.id, late.id]);
}

pub async fn test_apply_assignment_conditions<S: RosterStore>(store: &S) {
    let t0 = base_time();
    let first = make_closer(store, "First", t0).await;
    let second = make_closer(store, "Second", t0).await;
    let appointment = make_appointment(store, t0 + Duration::hours(2)).await;

    assert!(!store.apply_assignment(appointment.id, Uuid::new_v4()).await.unwrap());
    assert!(!store.apply_assignment(Uuid::new_v4(), first.id).await.unwrap());

    assert!(store.apply_assignment(appointment.id, first.id).await.unwrap());
    let fetched = store.get_appointment(appointment.id).await.unwrap().unwrap();
    assert_eq!(fetched.closer_id, Some(first.id));
    assert_eq!(fetched.status, AppointmentStatus::Confirmed);
    assert_eq!(store.get_closer(first.id).await.unwrap().unwrap().total_calls, 1);

    // Already assigned: nobody else gets it and no load moves.
    assert!(!store.apply_assignment(appointment.id, second.id).await.unwrap());
    assert_eq!(store.get_closer(second.id).await.unwrap().unwrap().total_calls, 0);
    assert_eq!(store.get_closer(first.id).await.unwrap().unwrap().total_calls, 1);
}

pub async fn test_record_outcome_and_recount<S: RosterStore>(store: &S) {
    let t0 = base_time();
    let closer = make_closer(store, "Counted", t0).await;

    let outcomes = [
        (AppointmentOutcome::Sale, Some(dec!(1200))),
        (AppointmentOutcome::Sale, Some(dec!(800.50))),
        (AppointmentOutcome::NoSale, None),
        (AppointmentOutcome::NoShow, None),
    ];
    let mut no_show = None;
    for (outcome, sale_value) in outcomes {
        let appointment = make_appointment(store, t0).await;
        assert!(store.apply_assignment(appointment.id, closer.id).await.unwrap());
        store
            .record_outcome(appointment.id, outcome, sale_value)
            .await
            .unwrap();
        if outcome == AppointmentOutcome::NoShow {
            no_show = Some(appointment.id);
        }
    }
    // Assigned but not yet held: excluded from the denominator.
    let pending = make_appointment(store, t0).await;
    assert!(store.apply_assignment(pending.id, closer.id).await.unwrap());

    let no_show = store
        .get_appointment(no_show.expect("no-show recorded"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(no_show.status, AppointmentStatus::NoShow);
    assert_eq!(no_show.outcome, Some(AppointmentOutcome::NoShow));

    let stats = store.recount_closer(closer.id).await.unwrap();
    assert_eq!(stats.total_conversions, 2);
    assert_eq!(stats.total_revenue, dec!(2000.50));
    assert_eq!(stats.conversion_rate, dec!(66.67));

    store.overwrite_closer_stats(closer.id, &stats).await.unwrap();
    let fetched = store.get_closer(closer.id).await.unwrap().unwrap();
    assert_eq!(fetched.stats, stats);
    assert_eq!(fetched.total_calls, 5);

    let err = store
        .record_outcome(Uuid::new_v4(), AppointmentOutcome::Sale, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { kind: "appointment", .. }));
}

pub async fn test_recount_closer_without_calls<S: RosterStore>(store: &S) {
    let closer = make_closer(store, "Fresh", base_time()).await;
    let stats = store.recount_closer(closer.id).await.unwrap();
    assert_eq!(stats, CloserStats::from_counts(0, Decimal::ZERO, 0));
    assert_eq!(stats.conversion_rate, Decimal::ZERO);

    let err = store
        .overwrite_closer_stats(Uuid::new_v4(), &stats)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { kind: "closer", .. }));
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all RosterStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_roster_store_tests {
    ($store:expr) => {
        use $crate::storage::roster_store_tests::*;

        // closers
        test_closer_round_trip($store).await;
        println!("  test_closer_round_trip: PASSED");

        test_eligible_closers_order_and_filter($store).await;
        println!("  test_eligible_closers_order_and_filter: PASSED");

        test_delete_closer_clears_appointments($store).await;
        println!("  test_delete_closer_clears_appointments: PASSED");

        // appointments
        test_unassigned_appointments_order($store).await;
        println!("  test_unassigned_appointments_order: PASSED");

        test_apply_assignment_conditions($store).await;
        println!("  test_apply_assignment_conditions: PASSED");

        test_record_outcome_and_recount($store).await;
        println!("  test_record_outcome_and_recount: PASSED");

        test_recount_closer_without_calls($store).await;
        println!("  test_recount_closer_without_calls: PASSED");
    };
}
