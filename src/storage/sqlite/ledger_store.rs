//! SQLite LedgerStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_query::{Expr, Func, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::rows::{self, AFFILIATE_COLUMNS, CLICK_COLUMNS, CONVERSION_COLUMNS, PAYOUT_COLUMNS};
use super::{begin_immediate, finish};
use crate::interfaces::{
    CommissionTransition, InsertOutcome, LedgerStore, PayoutTotals, Result, SettleResult,
    StorageError, TransitionResult,
};
use crate::model::money::from_cents;
use crate::model::{
    Affiliate, AffiliateClick, AffiliateConversion, AffiliateCounters, AffiliatePayout,
    CommissionStatus, ConversionStatus, ConversionType, PayoutStatus,
};
use crate::storage::helpers::{cents, distinct_ids, format_timestamp};
use crate::storage::schema::{
    AffiliateClicks, AffiliateConversions, AffiliatePayouts, Affiliates, CREATE_LEDGER_TABLES,
};

/// SQLite implementation of LedgerStore.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

/// Cached counter column bumped by a conversion of each type.
fn counter_column(conversion_type: ConversionType) -> Affiliates {
    match conversion_type {
        ConversionType::QuizCompletion => Affiliates::TotalLeads,
        ConversionType::Booking => Affiliates::TotalBookings,
        ConversionType::Sale => Affiliates::TotalSales,
    }
}

impl SqliteLedgerStore {
    /// Create a new SQLite ledger store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_LEDGER_TABLES).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_click_in(
        conn: &mut SqliteConnection,
        click: &AffiliateClick,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let affiliate_id = click.affiliate_id.to_string();

        let query = Query::select()
            .column(AffiliateClicks::Id)
            .from(AffiliateClicks::Table)
            .and_where(Expr::col(AffiliateClicks::AffiliateId).eq(affiliate_id.as_str()))
            .and_where(Expr::col(AffiliateClicks::UserAgent).eq(click.user_agent.as_str()))
            .and_where(Expr::col(AffiliateClicks::CreatedAt).gte(format_timestamp(dedupe_since)))
            .order_by(AffiliateClicks::CreatedAt, Order::Desc)
            .limit(1)
            .to_string(SqliteQueryBuilder);

        if sqlx::query(&query)
            .fetch_optional(&mut *conn)
            .await?
            .is_some()
        {
            return Ok(InsertOutcome::Duplicate);
        }

        let query = Query::insert()
            .into_table(AffiliateClicks::Table)
            .columns(CLICK_COLUMNS)
            .values_panic([
                click.id.to_string().into(),
                affiliate_id.clone().into(),
                click.referral_code.clone().into(),
                click.ip_address.clone().into(),
                click.user_agent.clone().into(),
                click.utm.source.clone().into(),
                click.utm.medium.clone().into(),
                click.utm.campaign.clone().into(),
                click.source.as_str().into(),
                format_timestamp(click.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        let query = Query::update()
            .table(Affiliates::Table)
            .value(Affiliates::TotalClicks, Expr::col(Affiliates::TotalClicks).add(1))
            .and_where(Expr::col(Affiliates::Id).eq(affiliate_id))
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        Ok(InsertOutcome::Inserted)
    }

    async fn insert_conversion_in(
        conn: &mut SqliteConnection,
        conversion: &AffiliateConversion,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let affiliate_id = conversion.affiliate_id.to_string();

        let query = Query::select()
            .column(AffiliateConversions::Id)
            .from(AffiliateConversions::Table)
            .and_where(Expr::col(AffiliateConversions::AffiliateId).eq(affiliate_id.as_str()))
            .and_where(
                Expr::col(AffiliateConversions::ConversionType)
                    .eq(conversion.conversion_type.as_str()),
            )
            .and_where(
                Expr::col(AffiliateConversions::CreatedAt).gte(format_timestamp(dedupe_since)),
            )
            .limit(1)
            .to_string(SqliteQueryBuilder);

        if sqlx::query(&query)
            .fetch_optional(&mut *conn)
            .await?
            .is_some()
        {
            return Ok(InsertOutcome::Duplicate);
        }

        let commission_cents = cents(conversion.commission_amount)?;
        let sale_value_cents = conversion.sale_value.map(cents).transpose()?;

        let query = Query::insert()
            .into_table(AffiliateConversions::Table)
            .columns(CONVERSION_COLUMNS)
            .values_panic([
                conversion.id.to_string().into(),
                affiliate_id.clone().into(),
                conversion.quiz_session_id.map(|id| id.to_string()).into(),
                conversion.conversion_type.as_str().into(),
                conversion.status.as_str().into(),
                commission_cents.into(),
                sale_value_cents.into(),
                conversion.commission_status.as_str().into(),
                format_timestamp(conversion.hold_until).into(),
                conversion.payout_id.map(|id| id.to_string()).into(),
                conversion.forfeit_reason.clone().into(),
                format_timestamp(conversion.commission_updated_at).into(),
                format_timestamp(conversion.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        let counter = counter_column(conversion.conversion_type);
        let query = Query::update()
            .table(Affiliates::Table)
            .value(counter, Expr::col(counter).add(1))
            .value(
                Affiliates::TotalCommissionCents,
                Expr::col(Affiliates::TotalCommissionCents).add(commission_cents),
            )
            .and_where(Expr::col(Affiliates::Id).eq(affiliate_id))
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        Ok(InsertOutcome::Inserted)
    }

    async fn fetch_conversion(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<AffiliateConversion>> {
        let query = Query::select()
            .columns(CONVERSION_COLUMNS)
            .from(AffiliateConversions::Table)
            .and_where(Expr::col(AffiliateConversions::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        row.as_ref().map(rows::conversion).transpose()
    }

    async fn release_due_in(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let query = Query::select()
            .column(AffiliateConversions::Id)
            .from(AffiliateConversions::Table)
            .and_where(
                Expr::col(AffiliateConversions::CommissionStatus)
                    .eq(CommissionStatus::Held.as_str()),
            )
            .and_where(Expr::col(AffiliateConversions::HoldUntil).lte(format_timestamp(now)))
            .order_by(AffiliateConversions::HoldUntil, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let due = sqlx::query(&query).fetch_all(&mut *conn).await?;
        let mut released = Vec::with_capacity(due.len());
        for row in due {
            let raw: String = row.try_get("id")?;
            released.push(Uuid::parse_str(&raw)?);
        }
        if released.is_empty() {
            return Ok(released);
        }

        let query = Query::update()
            .table(AffiliateConversions::Table)
            .value(
                AffiliateConversions::CommissionStatus,
                CommissionStatus::Available.as_str(),
            )
            .value(AffiliateConversions::CommissionUpdatedAt, format_timestamp(now))
            .and_where(
                Expr::col(AffiliateConversions::Id)
                    .is_in(released.iter().map(|id| id.to_string())),
            )
            .and_where(
                Expr::col(AffiliateConversions::CommissionStatus)
                    .eq(CommissionStatus::Held.as_str()),
            )
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        Ok(released)
    }

    async fn transition_in(
        conn: &mut SqliteConnection,
        transition: &CommissionTransition,
    ) -> Result<TransitionResult> {
        let ids = distinct_ids(&transition.ids);

        // Validate every row before writing any, so a rejection leaves no trace.
        let mut targets = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(conversion) = Self::fetch_conversion(conn, *id).await? else {
                return Ok(TransitionResult::Missing(*id));
            };
            if !transition.expected.contains(&conversion.commission_status) {
                return Ok(TransitionResult::Rejected {
                    id: *id,
                    current: conversion.commission_status,
                });
            }
            targets.push(conversion);
        }

        let expected: Vec<&'static str> = transition.expected.iter().map(|s| s.as_str()).collect();
        for conversion in &targets {
            // Statements are not Send; render before the next await.
            let query = {
                let mut update = Query::update();
                update
                    .table(AffiliateConversions::Table)
                    .value(AffiliateConversions::CommissionStatus, transition.target.as_str())
                    .value(
                        AffiliateConversions::CommissionUpdatedAt,
                        format_timestamp(transition.at),
                    )
                    .and_where(Expr::col(AffiliateConversions::Id).eq(conversion.id.to_string()))
                    .and_where(
                        Expr::col(AffiliateConversions::CommissionStatus).is_in(expected.clone()),
                    );
                if transition.target == CommissionStatus::Forfeited {
                    update.value(
                        AffiliateConversions::ForfeitReason,
                        transition.reason.clone(),
                    );
                }
                update.to_string(SqliteQueryBuilder)
            };
            let affected = sqlx::query(&query).execute(&mut *conn).await?.rows_affected();
            if affected != 1 {
                return Err(StorageError::Corrupt {
                    table: "affiliate_conversions",
                    detail: format!("conditional update of {} matched {affected} rows", conversion.id),
                });
            }

            if transition.target == CommissionStatus::Forfeited {
                let query = Query::update()
                    .table(Affiliates::Table)
                    .value(
                        Affiliates::TotalCommissionCents,
                        Expr::col(Affiliates::TotalCommissionCents)
                            .sub(cents(conversion.commission_amount)?),
                    )
                    .and_where(Expr::col(Affiliates::Id).eq(conversion.affiliate_id.to_string()))
                    .to_string(SqliteQueryBuilder);
                sqlx::query(&query).execute(&mut *conn).await?;
            }
        }

        Ok(TransitionResult::Applied(targets.len()))
    }

    async fn settle_in(
        conn: &mut SqliteConnection,
        ids: &[Uuid],
        payout_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SettleResult> {
        let payout_key = payout_id.to_string();
        let query = Query::select()
            .columns(PAYOUT_COLUMNS)
            .from(AffiliatePayouts::Table)
            .and_where(Expr::col(AffiliatePayouts::Id).eq(payout_key.as_str()))
            .to_string(SqliteQueryBuilder);
        let Some(row) = sqlx::query(&query).fetch_optional(&mut *conn).await? else {
            return Ok(SettleResult::PayoutMissing);
        };
        let payout = rows::payout(&row)?;
        if payout.status != PayoutStatus::Completed {
            return Ok(SettleResult::PayoutNotCompleted(payout.status));
        }

        let ids = distinct_ids(ids);
        let mut requested = Decimal::ZERO;
        for id in &ids {
            let Some(conversion) = Self::fetch_conversion(conn, *id).await? else {
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

        let query = Query::select()
            .expr(Func::sum(Expr::col(AffiliateConversions::CommissionCents)))
            .from(AffiliateConversions::Table)
            .and_where(Expr::col(AffiliateConversions::PayoutId).eq(payout_key.as_str()))
            .to_string(SqliteQueryBuilder);
        let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
        let already_settled = from_cents(row.try_get::<Option<i64>, _>(0)?.unwrap_or(0));

        if already_settled + requested > payout.amount_due {
            return Ok(SettleResult::ExceedsPayout {
                already_settled,
                requested,
                amount_due: payout.amount_due,
            });
        }

        for id in &ids {
            let query = Query::update()
                .table(AffiliateConversions::Table)
                .value(AffiliateConversions::CommissionStatus, CommissionStatus::Paid.as_str())
                .value(AffiliateConversions::PayoutId, payout_key.as_str())
                .value(AffiliateConversions::CommissionUpdatedAt, format_timestamp(at))
                .and_where(Expr::col(AffiliateConversions::Id).eq(id.to_string()))
                .and_where(
                    Expr::col(AffiliateConversions::CommissionStatus)
                        .eq(CommissionStatus::Available.as_str()),
                )
                .to_string(SqliteQueryBuilder);
            let affected = sqlx::query(&query).execute(&mut *conn).await?.rows_affected();
            if affected != 1 {
                return Err(StorageError::Corrupt {
                    table: "affiliate_conversions",
                    detail: format!("settlement of {id} matched {affected} rows"),
                });
            }
        }

        Ok(SettleResult::Applied(ids.len()))
    }

    async fn sum_payouts(&self, affiliate_id: Uuid, statuses: &[PayoutStatus]) -> Result<Decimal> {
        let query = Query::select()
            .expr(Func::sum(Expr::col(AffiliatePayouts::AmountDueCents)))
            .from(AffiliatePayouts::Table)
            .and_where(Expr::col(AffiliatePayouts::AffiliateId).eq(affiliate_id.to_string()))
            .and_where(Expr::col(AffiliatePayouts::Status).is_in(statuses.iter().map(|s| s.as_str())))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        Ok(from_cents(row.try_get::<Option<i64>, _>(0)?.unwrap_or(0)))
    }

    async fn count_conversions(&self, affiliate_id: Uuid, conversion_type: ConversionType) -> Result<i64> {
        let query = Query::select()
            .expr(Func::count(Expr::col(AffiliateConversions::Id)))
            .from(AffiliateConversions::Table)
            .and_where(Expr::col(AffiliateConversions::AffiliateId).eq(affiliate_id.to_string()))
            .and_where(Expr::col(AffiliateConversions::ConversionType).eq(conversion_type.as_str()))
            .and_where(
                Expr::col(AffiliateConversions::Status).ne(ConversionStatus::Cancelled.as_str()),
            )
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn insert_affiliate(&self, affiliate: &Affiliate) -> Result<()> {
        let query = Query::insert()
            .into_table(Affiliates::Table)
            .columns(AFFILIATE_COLUMNS)
            .values_panic([
                affiliate.id.to_string().into(),
                affiliate.name.clone().into(),
                affiliate.email.clone().into(),
                affiliate.referral_code.clone().into(),
                affiliate.tier.as_str().into(),
                affiliate.commission_rate.to_string().into(),
                affiliate.is_active.into(),
                affiliate.custom_link.clone().into(),
                affiliate.counters.total_clicks.into(),
                affiliate.counters.total_leads.into(),
                affiliate.counters.total_bookings.into(),
                affiliate.counters.total_sales.into(),
                cents(affiliate.counters.total_commission)?.into(),
                format_timestamp(affiliate.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        match sqlx::query(&query).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::AlreadyExists {
                    kind: "affiliate",
                    id: affiliate.referral_code.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_affiliate(&self, id: Uuid) -> Result<Option<Affiliate>> {
        let query = Query::select()
            .columns(AFFILIATE_COLUMNS)
            .from(Affiliates::Table)
            .and_where(Expr::col(Affiliates::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(rows::affiliate).transpose()
    }

    async fn find_affiliate_by_code(&self, referral_code: &str) -> Result<Option<Affiliate>> {
        let query = Query::select()
            .columns(AFFILIATE_COLUMNS)
            .from(Affiliates::Table)
            .and_where(Expr::col(Affiliates::ReferralCode).eq(referral_code))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(rows::affiliate).transpose()
    }

    async fn list_affiliates(&self) -> Result<Vec<Affiliate>> {
        let query = Query::select()
            .columns(AFFILIATE_COLUMNS)
            .from(Affiliates::Table)
            .order_by(Affiliates::CreatedAt, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let records = sqlx::query(&query).fetch_all(&self.pool).await?;
        records.iter().map(rows::affiliate).collect()
    }

    async fn insert_click(
        &self,
        click: &AffiliateClick,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::insert_click_in(&mut tx, click, dedupe_since).await;
        finish(tx, result).await
    }

    async fn list_clicks(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateClick>> {
        let query = Query::select()
            .columns(CLICK_COLUMNS)
            .from(AffiliateClicks::Table)
            .and_where(Expr::col(AffiliateClicks::AffiliateId).eq(affiliate_id.to_string()))
            .order_by(AffiliateClicks::CreatedAt, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let records = sqlx::query(&query).fetch_all(&self.pool).await?;
        records.iter().map(rows::click).collect()
    }

    async fn insert_conversion(
        &self,
        conversion: &AffiliateConversion,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::insert_conversion_in(&mut tx, conversion, dedupe_since).await;
        finish(tx, result).await
    }

    async fn get_conversion(&self, id: Uuid) -> Result<Option<AffiliateConversion>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_conversion(&mut conn, id).await
    }

    async fn list_conversions(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateConversion>> {
        let query = Query::select()
            .columns(CONVERSION_COLUMNS)
            .from(AffiliateConversions::Table)
            .and_where(Expr::col(AffiliateConversions::AffiliateId).eq(affiliate_id.to_string()))
            .order_by(AffiliateConversions::CreatedAt, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let records = sqlx::query(&query).fetch_all(&self.pool).await?;
        records.iter().map(rows::conversion).collect()
    }

    async fn release_due_commissions(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::release_due_in(&mut tx, now).await;
        finish(tx, result).await
    }

    async fn transition_commissions(
        &self,
        transition: &CommissionTransition,
    ) -> Result<TransitionResult> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::transition_in(&mut tx, transition).await;
        finish(tx, result).await
    }

    async fn settle_commissions(
        &self,
        ids: &[Uuid],
        payout_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SettleResult> {
        let mut tx = begin_immediate(&self.pool).await?;
        let result = Self::settle_in(&mut tx, ids, payout_id, at).await;
        finish(tx, result).await
    }

    async fn insert_payout(&self, payout: &AffiliatePayout) -> Result<()> {
        let query = Query::insert()
            .into_table(AffiliatePayouts::Table)
            .columns(PAYOUT_COLUMNS)
            .values_panic([
                payout.id.to_string().into(),
                payout.affiliate_id.to_string().into(),
                cents(payout.amount_due)?.into(),
                payout.status.as_str().into(),
                payout.paid_at.map(format_timestamp).into(),
                format_timestamp(payout.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_payout(&self, id: Uuid) -> Result<Option<AffiliatePayout>> {
        let query = Query::select()
            .columns(PAYOUT_COLUMNS)
            .from(AffiliatePayouts::Table)
            .and_where(Expr::col(AffiliatePayouts::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(rows::payout).transpose()
    }

    async fn list_payouts(&self, affiliate_id: Uuid) -> Result<Vec<AffiliatePayout>> {
        let query = Query::select()
            .columns(PAYOUT_COLUMNS)
            .from(AffiliatePayouts::Table)
            .and_where(Expr::col(AffiliatePayouts::AffiliateId).eq(affiliate_id.to_string()))
            .order_by(AffiliatePayouts::CreatedAt, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let records = sqlx::query(&query).fetch_all(&self.pool).await?;
        records.iter().map(rows::payout).collect()
    }

    async fn update_payout_status(
        &self,
        id: Uuid,
        status: PayoutStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let query = Query::update()
            .table(AffiliatePayouts::Table)
            .value(AffiliatePayouts::Status, status.as_str())
            .value(AffiliatePayouts::PaidAt, paid_at.map(format_timestamp))
            .and_where(Expr::col(AffiliatePayouts::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let affected = sqlx::query(&query).execute(&self.pool).await?.rows_affected();
        if affected == 0 {
            return Err(StorageError::NotFound {
                kind: "payout",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn payout_totals(&self, affiliate_id: Uuid) -> Result<PayoutTotals> {
        Ok(PayoutTotals {
            completed: self
                .sum_payouts(affiliate_id, &[PayoutStatus::Completed])
                .await?,
            in_flight: self
                .sum_payouts(affiliate_id, &[PayoutStatus::Pending, PayoutStatus::Processing])
                .await?,
        })
    }

    async fn commission_total(&self, affiliate_id: Uuid) -> Result<Decimal> {
        let query = Query::select()
            .expr(Func::sum(Expr::col(AffiliateConversions::CommissionCents)))
            .from(AffiliateConversions::Table)
            .and_where(Expr::col(AffiliateConversions::AffiliateId).eq(affiliate_id.to_string()))
            .and_where(
                Expr::col(AffiliateConversions::Status).ne(ConversionStatus::Cancelled.as_str()),
            )
            .and_where(
                Expr::col(AffiliateConversions::CommissionStatus)
                    .ne(CommissionStatus::Forfeited.as_str()),
            )
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        Ok(from_cents(row.try_get::<Option<i64>, _>(0)?.unwrap_or(0)))
    }

    async fn recount_affiliate(&self, id: Uuid) -> Result<AffiliateCounters> {
        let query = Query::select()
            .expr(Func::count(Expr::col(AffiliateClicks::Id)))
            .from(AffiliateClicks::Table)
            .and_where(Expr::col(AffiliateClicks::AffiliateId).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);
        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        let total_clicks: i64 = row.try_get(0)?;

        Ok(AffiliateCounters {
            total_clicks,
            total_leads: self.count_conversions(id, ConversionType::QuizCompletion).await?,
            total_bookings: self.count_conversions(id, ConversionType::Booking).await?,
            total_sales: self.count_conversions(id, ConversionType::Sale).await?,
            total_commission: self.commission_total(id).await?,
        })
    }

    async fn overwrite_affiliate_counters(
        &self,
        id: Uuid,
        counters: &AffiliateCounters,
    ) -> Result<()> {
        let query = Query::update()
            .table(Affiliates::Table)
            .value(Affiliates::TotalClicks, counters.total_clicks)
            .value(Affiliates::TotalLeads, counters.total_leads)
            .value(Affiliates::TotalBookings, counters.total_bookings)
            .value(Affiliates::TotalSales, counters.total_sales)
            .value(
                Affiliates::TotalCommissionCents,
                cents(counters.total_commission)?,
            )
            .and_where(Expr::col(Affiliates::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let affected = sqlx::query(&query).execute(&self.pool).await?.rows_affected();
        if affected == 0 {
            return Err(StorageError::NotFound {
                kind: "affiliate",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
