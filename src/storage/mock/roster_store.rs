//! Mock RosterStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::interfaces::{Result, RosterStore, StorageError};
use crate::model::{
    Appointment, AppointmentOutcome, AppointmentStatus, Closer, CloserStats,
};

#[derive(Default)]
struct RosterState {
    closers: HashMap<Uuid, Closer>,
    appointments: HashMap<Uuid, Appointment>,
}

/// Mock roster store that keeps closers and appointments in memory.
#[derive(Default)]
pub struct MockRosterStore {
    state: RwLock<RosterState>,
    fail_on_assign: RwLock<bool>,
}

impl MockRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `apply_assignment` fail with `StorageError::Unavailable`.
    pub async fn set_fail_on_assign(&self, fail: bool) {
        *self.fail_on_assign.write().await = fail;
    }

    /// Assign a closer directly, bypassing the assignable-status checks.
    pub async fn force_assign(&self, appointment_id: Uuid, closer_id: Uuid) {
        let mut state = self.state.write().await;
        if let Some(appointment) = state.appointments.get_mut(&appointment_id) {
            appointment.closer_id = Some(closer_id);
        }
    }
}

#[async_trait]
impl RosterStore for MockRosterStore {
    async fn insert_closer(&self, closer: &Closer) -> Result<()> {
        self.state
            .write()
            .await
            .closers
            .insert(closer.id, closer.clone());
        Ok(())
    }

    async fn get_closer(&self, id: Uuid) -> Result<Option<Closer>> {
        Ok(self.state.read().await.closers.get(&id).cloned())
    }

    async fn list_closers(&self) -> Result<Vec<Closer>> {
        let state = self.state.read().await;
        let mut closers: Vec<_> = state.closers.values().cloned().collect();
        closers.sort_by_key(|c| c.created_at);
        Ok(closers)
    }

    async fn list_eligible_closers(&self) -> Result<Vec<Closer>> {
        let state = self.state.read().await;
        let mut closers: Vec<_> = state
            .closers
            .values()
            .filter(|c| c.is_eligible())
            .cloned()
            .collect();
        // Same ordering as the SQL backend; ids compare as their hyphenated text.
        closers.sort_by(|a, b| {
            (a.total_calls, a.created_at, a.id.to_string())
                .cmp(&(b.total_calls, b.created_at, b.id.to_string()))
        });
        Ok(closers)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        self.state
            .write()
            .await
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.state.read().await.appointments.get(&id).cloned())
    }

    async fn list_unassigned_appointments(&self) -> Result<Vec<Appointment>> {
        let state = self.state.read().await;
        let mut appointments: Vec<_> = state
            .appointments
            .values()
            .filter(|a| a.closer_id.is_none() && a.status.is_assignable())
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.scheduled_at, a.created_at));
        Ok(appointments)
    }

    async fn apply_assignment(&self, appointment_id: Uuid, closer_id: Uuid) -> Result<bool> {
        if *self.fail_on_assign.read().await {
            return Err(StorageError::Unavailable("mock assign failure".to_string()));
        }
        let mut state = self.state.write().await;
        if !state.closers.contains_key(&closer_id) {
            return Ok(false);
        }

        let Some(appointment) = state.appointments.get_mut(&appointment_id) else {
            return Ok(false);
        };
        if appointment.closer_id.is_some() || !appointment.status.is_assignable() {
            return Ok(false);
        }
        appointment.closer_id = Some(closer_id);
        appointment.status = AppointmentStatus::Confirmed;

        if let Some(closer) = state.closers.get_mut(&closer_id) {
            closer.total_calls += 1;
        }
        Ok(true)
    }

    async fn record_outcome(
        &self,
        appointment_id: Uuid,
        outcome: AppointmentOutcome,
        sale_value: Option<Decimal>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let appointment =
            state
                .appointments
                .get_mut(&appointment_id)
                .ok_or(StorageError::NotFound {
                    kind: "appointment",
                    id: appointment_id.to_string(),
                })?;
        appointment.outcome = Some(outcome);
        appointment.sale_value = sale_value;
        appointment.status = match outcome {
            AppointmentOutcome::NoShow => AppointmentStatus::NoShow,
            _ => AppointmentStatus::Completed,
        };
        Ok(())
    }

    async fn recount_closer(&self, id: Uuid) -> Result<CloserStats> {
        let state = self.state.read().await;
        let mine: Vec<_> = state
            .appointments
            .values()
            .filter(|a| a.closer_id == Some(id))
            .collect();

        let sales: Vec<_> = mine
            .iter()
            .filter(|a| a.outcome == Some(AppointmentOutcome::Sale))
            .collect();
        let revenue: Decimal = sales.iter().filter_map(|a| a.sale_value).sum();
        let held_calls = mine
            .iter()
            .filter(|a| matches!(a.outcome, Some(o) if o != AppointmentOutcome::NoShow))
            .count();

        Ok(CloserStats::from_counts(
            sales.len() as i64,
            revenue,
            held_calls as i64,
        ))
    }

    async fn overwrite_closer_stats(&self, id: Uuid, stats: &CloserStats) -> Result<()> {
        let mut state = self.state.write().await;
        let closer = state.closers.get_mut(&id).ok_or(StorageError::NotFound {
            kind: "closer",
            id: id.to_string(),
        })?;
        closer.stats = stats.clone();
        Ok(())
    }

    async fn delete_closer(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if state.closers.remove(&id).is_none() {
            return Err(StorageError::NotFound {
                kind: "closer",
                id: id.to_string(),
            });
        }
        for appointment in state.appointments.values_mut() {
            if appointment.closer_id == Some(id) {
                appointment.closer_id = None;
            }
        }
        Ok(())
    }
}
