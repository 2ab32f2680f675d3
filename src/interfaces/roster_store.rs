//! Closer CRM storage interface.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::ledger_store::Result;
use crate::model::{Appointment, AppointmentOutcome, Closer, CloserStats};

/// Interface for closer and appointment persistence.
///
/// Implementations:
/// - `SqliteRosterStore`: SQLite storage
/// - `MockRosterStore`: In-memory mock for testing
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn insert_closer(&self, closer: &Closer) -> Result<()>;

    async fn get_closer(&self, id: Uuid) -> Result<Option<Closer>>;

    async fn list_closers(&self) -> Result<Vec<Closer>>;

    /// Active, approved closers, least-loaded first (ties by creation time).
    async fn list_eligible_closers(&self) -> Result<Vec<Closer>>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()>;

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// Appointments without a closer in `scheduled` or `confirmed` status,
    /// earliest first.
    async fn list_unassigned_appointments(&self) -> Result<Vec<Appointment>>;

    /// Assign a closer to an appointment that has none, confirm it, and
    /// increment the closer's `total_calls`, in one transaction.
    ///
    /// Returns `false` without writing if the appointment is missing or
    /// already assigned.
    async fn apply_assignment(&self, appointment_id: Uuid, closer_id: Uuid) -> Result<bool>;

    /// Record the result of a call. `NoShow` marks the appointment `no_show`,
    /// every other outcome marks it `completed`.
    async fn record_outcome(
        &self,
        appointment_id: Uuid,
        outcome: AppointmentOutcome,
        sale_value: Option<Decimal>,
    ) -> Result<()>;

    /// Recompute a closer's stats from their appointments.
    async fn recount_closer(&self, id: Uuid) -> Result<CloserStats>;

    async fn overwrite_closer_stats(&self, id: Uuid, stats: &CloserStats) -> Result<()>;

    /// Remove a closer and clear them from their appointments.
    async fn delete_closer(&self, id: Uuid) -> Result<()>;
}
