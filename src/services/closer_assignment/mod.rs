//! Load-balanced appointment assignment.
//!
//! [`plan`] is the whole algorithm and touches no storage: it takes the
//! current load of each eligible closer and returns the batch assignment
//! plus the loads after it. [`CloserScheduler`] reads the snapshot, plans,
//! and persists each assignment as its own atomic step.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::LedgerError;
use crate::interfaces::RosterStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub appointment_id: Uuid,
    pub closer_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPlan {
    pub assignments: Vec<Assignment>,
    /// Closer loads after the batch, in input order.
    pub loads: Vec<(Uuid, i64)>,
}

/// Assign each appointment to the least-loaded closer.
///
/// Ties go to the closer listed first. The chosen closer's load is bumped
/// before the next appointment, so with equal starting loads appointment
/// `i` lands on closer `i mod n`. Returns an empty plan when `loads` is
/// empty.
pub fn plan(appointments: &[Uuid], loads: &[(Uuid, i64)]) -> AssignmentPlan {
    let mut loads = loads.to_vec();
    let mut assignments = Vec::with_capacity(appointments.len());

    if loads.is_empty() {
        return AssignmentPlan { assignments, loads };
    }

    for appointment_id in appointments {
        let mut pick = 0;
        for (i, (_, load)) in loads.iter().enumerate().skip(1) {
            if *load < loads[pick].1 {
                pick = i;
            }
        }
        loads[pick].1 += 1;
        assignments.push(Assignment {
            appointment_id: *appointment_id,
            closer_id: loads[pick].0,
        });
    }

    AssignmentPlan { assignments, loads }
}

/// Result of an assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentReport {
    pub assigned: Vec<Assignment>,
    /// Appointments assigned or closed by someone else mid-pass.
    pub skipped: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "closerId", rename_all = "snake_case")]
pub enum AssignOutcome {
    Assigned(Uuid),
    /// The appointment already had this closer; nothing changed.
    AlreadyAssigned(Uuid),
}

/// Hands unassigned appointments to active, approved closers.
pub struct CloserScheduler {
    roster: Arc<dyn RosterStore>,
}

impl CloserScheduler {
    pub fn new(roster: Arc<dyn RosterStore>) -> Self {
        Self { roster }
    }

    /// Assign every waiting appointment.
    ///
    /// Fails with `NoEligibleClosers` when appointments are waiting but no
    /// closer can take them; the appointments stay unassigned for the next
    /// pass.
    pub async fn assign_unassigned(&self) -> Result<AssignmentReport, LedgerError> {
        let appointments = self.roster.list_unassigned_appointments().await?;
        if appointments.is_empty() {
            debug!("No unassigned appointments");
            return Ok(AssignmentReport::default());
        }

        let loads = self.eligible_loads().await?;
        if loads.is_empty() {
            warn!(waiting = appointments.len(), "No eligible closers for waiting appointments");
            return Err(LedgerError::NoEligibleClosers);
        }

        let ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();
        let plan = plan(&ids, &loads);

        let mut report = AssignmentReport::default();
        for assignment in plan.assignments {
            if self
                .roster
                .apply_assignment(assignment.appointment_id, assignment.closer_id)
                .await?
            {
                debug!(
                    appointment_id = %assignment.appointment_id,
                    closer_id = %assignment.closer_id,
                    "Appointment assigned"
                );
                report.assigned.push(assignment);
            } else {
                report.skipped.push(assignment.appointment_id);
            }
        }

        info!(
            assigned = report.assigned.len(),
            skipped = report.skipped.len(),
            closers = loads.len(),
            "Assignment pass complete"
        );
        Ok(report)
    }

    /// Assign a single appointment.
    pub async fn assign_one(&self, appointment_id: Uuid) -> Result<AssignOutcome, LedgerError> {
        let appointment = self.load_appointment(appointment_id).await?;
        if let Some(closer_id) = appointment.closer_id {
            return Ok(AssignOutcome::AlreadyAssigned(closer_id));
        }
        if !appointment.status.is_assignable() {
            return Err(LedgerError::invalid_state(
                "appointment",
                appointment_id,
                format!("cannot assign a {} appointment", appointment.status),
            ));
        }

        let loads = self.eligible_loads().await?;
        let Some(assignment) = plan(&[appointment_id], &loads).assignments.first().copied() else {
            warn!(%appointment_id, "No eligible closers");
            return Err(LedgerError::NoEligibleClosers);
        };

        if self
            .roster
            .apply_assignment(appointment_id, assignment.closer_id)
            .await?
        {
            info!(%appointment_id, closer_id = %assignment.closer_id, "Appointment assigned");
            return Ok(AssignOutcome::Assigned(assignment.closer_id));
        }

        // Lost a race; report whatever won it.
        let appointment = self.load_appointment(appointment_id).await?;
        match appointment.closer_id {
            Some(closer_id) => Ok(AssignOutcome::AlreadyAssigned(closer_id)),
            None => Err(LedgerError::invalid_state(
                "appointment",
                appointment_id,
                format!("cannot assign a {} appointment", appointment.status),
            )),
        }
    }

    async fn load_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<crate::model::Appointment, LedgerError> {
        self.roster
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("appointment", appointment_id))
    }

    async fn eligible_loads(&self) -> Result<Vec<(Uuid, i64)>, LedgerError> {
        Ok(self
            .roster
            .list_eligible_closers()
            .await?
            .into_iter()
            .map(|c| (c.id, c.total_calls))
            .collect())
    }
}
