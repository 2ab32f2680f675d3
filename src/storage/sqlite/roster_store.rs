//! SQLite RosterStore implementation.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_query::{Expr, Func, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::rows::{self, APPOINTMENT_COLUMNS, CLOSER_COLUMNS};
use super::{begin_immediate, finish};
use crate::interfaces::{Result, RosterStore, StorageError};
use crate::model::money::from_cents;
use crate::model::{
    Appointment, AppointmentOutcome, AppointmentStatus, Closer, CloserStats,
};
use crate::storage::helpers::{cents, format_timestamp};
use crate::storage::schema::{Appointments, Closers, CREATE_ROSTER_TABLES};

/// SQLite implementation of RosterStore.
pub struct SqliteRosterStore {
    pool: SqlitePool,
}

impl SqliteRosterStore {
    /// Create a new SQLite roster store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_ROSTER_TABLES).execute(&self.pool).await?;
        Ok(())
    }

    async fn apply_assignment_in(
        conn: &mut SqliteConnection,
        appointment_id: Uuid,
        closer_id: Uuid,
    ) -> Result<bool> {
        let closer_key = closer_id.to_string();

        let query = Query::select()
            .column(Closers::Id)
            .from(Closers::Table)
            .and_where(Expr::col(Closers::Id).eq(closer_key.as_str()))
            .to_string(SqliteQueryBuilder);
        if sqlx::query(&query)
            .fetch_optional(&mut *conn)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let query = Query::update()
            .table(Appointments::Table)
            .value(Appointments::CloserId, closer_key.as_str())
            .value(Appointments::Status, AppointmentStatus::Confirmed.as_str())
            .and_where(Expr::col(Appointments::Id).eq(appointment_id.to_string()))
            .and_where(Expr::col(Appointments::CloserId).is_null())
            .and_where(
                Expr::col(Appointments::Status)
                    .is_in(AppointmentStatus::ASSIGNABLE.iter().map(|s| s.as_str())),
            )
            .to_string(SqliteQueryBuilder);
        let affected = sqlx::query(&query).execute(&mut *conn).await?.rows_affected();
        if affected == 0 {
            return Ok(false);
        }

        let query = Query::update()
            .table(Closers::Table)
            .value(Closers::TotalCalls, Expr::col(Closers::TotalCalls).add(1))
            .and_where(Expr::col(Closers::Id).eq(closer_key))
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        Ok(true)
    }

    async fn delete_closer_in(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
        let key = id.to_string();

        let query = Query::update()
            .table(Appointments::Table)
            .value(Appointments::CloserId, Option::<String>::None)
            .and_where(Expr::col(Appointments::CloserId).eq(key.as_str()))
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        let query = Query::delete()
            .from_table(Closers::Table)
            .and_where(Expr::col(Closers::Id).eq(key.as_str()))
            .to_string(SqliteQueryBuilder);
        let affected = sqlx::query(&query).execute(&mut *conn).await?.rows_affected();
        if affected == 0 {
            return Err(StorageError::NotFound { kind: "closer", id: key });
        }
        Ok(())
    }

    async fn scalar(&self, query: &str) -> Result<i64> {
        let row = sqlx::query(query).fetch_one(&self.pool).await?;
        Ok(row.try_get::<Option<i64>, _>(0)?.unwrap_or(0))
    }
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn insert_closer(&self, closer: &Closer) -> Result<()> {
        let query = Query::insert()
            .into_table(Closers::Table)
            .columns(CLOSER_COLUMNS)
            .values_panic([
                closer.id.to_string().into(),
                closer.name.clone().into(),
                closer.email.clone().into(),
                closer.is_active.into(),
                closer.is_approved.into(),
                closer.total_calls.into(),
                closer.stats.total_conversions.into(),
                cents(closer.stats.total_revenue)?.into(),
                closer.stats.conversion_rate.to_string().into(),
                format_timestamp(closer.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_closer(&self, id: Uuid) -> Result<Option<Closer>> {
        let query = Query::select()
            .columns(CLOSER_COLUMNS)
            .from(Closers::Table)
            .and_where(Expr::col(Closers::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(rows::closer).transpose()
    }

    async fn list_closers(&self) -> Result<Vec<Closer>> {
        let query = Query::select()
            .columns(CLOSER_COLUMNS)
            .from(Closers::Table)
            .order_by(Closers::CreatedAt, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let records = sqlx::query(&query).fetch_all(&self.pool).await?;
        records.iter().map(rows::closer).collect()
    }

    async fn list_eligible_closers(&self) -> Result<Vec<Closer>> {
        let query = Query::select()
            .columns(CLOSER_COLUMNS)
            .from(Closers::Table)
            .and_where(Expr::col(Closers::IsActive).eq(true))
            .and_where(Expr::col(Closers::IsApproved).eq(true))
            .order_by(Closers::TotalCalls, Order::Asc)
            .order_by(Closers::CreatedAt, Order::Asc)
            .order_by(Closers::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let records = sqlx::query(&query).fetch_all(&self.pool).await?;
        records.iter().map(rows::closer).collect()
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        let query = Query::insert()
            .into_table(Appointments::Table)
            .columns(APPOINTMENT_COLUMNS)
            .values_panic([
                appointment.id.to_string().into(),
                appointment.customer_name.clone().into(),
                appointment.customer_email.clone().into(),
                format_timestamp(appointment.scheduled_at).into(),
                appointment.status.as_str().into(),
                appointment.outcome.map(|o| o.as_str().to_string()).into(),
                appointment.sale_value.map(cents).transpose()?.into(),
                appointment.closer_id.map(|id| id.to_string()).into(),
                format_timestamp(appointment.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        let query = Query::select()
            .columns(APPOINTMENT_COLUMNS)
            .from(Appointments::Table)
            .and_where(Expr::col(Appointments::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(rows::appointment).transpose()
    }

    async fn list_unassigned_appointments(&self) -> Result<Vec<Appointment>> {
        let query = Query::select()
            .columns(APPOINTMENT_COLUMNS)
            .from(Appointments::Table)
            .and_where(Expr::col(Appointments::CloserId).is_null())
            .and_where(
                Expr::col(Appointments::Status)
                    .is_in(AppointmentStatus::ASSIGNABLE.iter().map(|s| s.as_str())),
            )
            .order_by(Appointments::ScheduledAt, Order::Asc)
            .order_by(Appointments::CreatedAt, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let records = sqlx::query(&query).fetch_all(&self.pool).await?;
        records.iter().map(rows::appointment).collect()
    }

    async fn apply_assignment(&self, appointment_id: Uuid, closer_id: Uuid) -> Result<bool> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::apply_assignment_in(&mut tx, appointment_id, closer_id).await;
        finish(tx, result).await
    }

    async fn record_outcome(
        &self,
        appointment_id: Uuid,
        outcome: AppointmentOutcome,
        sale_value: Option<Decimal>,
    ) -> Result<()> {
        let status = match outcome {
            AppointmentOutcome::NoShow => AppointmentStatus::NoShow,
            _ => AppointmentStatus::Completed,
        };
        let query = Query::update()
            .table(Appointments::Table)
            .value(Appointments::Outcome, outcome.as_str())
            .value(Appointments::SaleValueCents, sale_value.map(cents).transpose()?)
            .value(Appointments::Status, status.as_str())
            .and_where(Expr::col(Appointments::Id).eq(appointment_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let affected = sqlx::query(&query).execute(&self.pool).await?.rows_affected();
        if affected == 0 {
            return Err(StorageError::NotFound {
                kind: "appointment",
                id: appointment_id.to_string(),
            });
        }
        Ok(())
    }

    async fn recount_closer(&self, id: Uuid) -> Result<CloserStats> {
        let key = id.to_string();
        let sale = AppointmentOutcome::Sale.as_str();

        let conversions_query = Query::select()
            .expr(Func::count(Expr::col(Appointments::Id)))
            .from(Appointments::Table)
            .and_where(Expr::col(Appointments::CloserId).eq(key.as_str()))
            .and_where(Expr::col(Appointments::Outcome).eq(sale))
            .to_string(SqliteQueryBuilder);

        let revenue_query = Query::select()
            .expr(Func::sum(Expr::col(Appointments::SaleValueCents)))
            .from(Appointments::Table)
            .and_where(Expr::col(Appointments::CloserId).eq(key.as_str()))
            .and_where(Expr::col(Appointments::Outcome).eq(sale))
            .to_string(SqliteQueryBuilder);

        let held_query = Query::select()
            .expr(Func::count(Expr::col(Appointments::Id)))
            .from(Appointments::Table)
            .and_where(Expr::col(Appointments::CloserId).eq(key.as_str()))
            .and_where(Expr::col(Appointments::Outcome).is_not_null())
            .and_where(Expr::col(Appointments::Outcome).ne(AppointmentOutcome::NoShow.as_str()))
            .to_string(SqliteQueryBuilder);

        let conversions = self.scalar(&conversions_query).await?;
        let revenue_cents = self.scalar(&revenue_query).await?;
        let held_calls = self.scalar(&held_query).await?;

        Ok(CloserStats::from_counts(
            conversions,
            from_cents(revenue_cents),
            held_calls,
        ))
    }

    async fn overwrite_closer_stats(&self, id: Uuid, stats: &CloserStats) -> Result<()> {
        let query = Query::update()
            .table(Closers::Table)
            .value(Closers::TotalConversions, stats.total_conversions)
            .value(Closers::TotalRevenueCents, cents(stats.total_revenue)?)
            .value(Closers::ConversionRate, stats.conversion_rate.to_string())
            .and_where(Expr::col(Closers::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let affected = sqlx::query(&query).execute(&self.pool).await?.rows_affected();
        if affected == 0 {
            return Err(StorageError::NotFound {
                kind: "closer",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_closer(&self, id: Uuid) -> Result<()> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::delete_closer_in(&mut tx, id).await;
        finish(tx, result).await
    }
}
