//! Row decoding for the SQLite stores.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::model::money::from_cents;
use crate::model::{
    Affiliate, AffiliateClick, AffiliateConversion, AffiliateCounters, AffiliatePayout,
    AffiliateTier, Appointment, AppointmentOutcome, AppointmentStatus, ClickSource, Closer,
    CloserStats, CommissionStatus, ConversionStatus, ConversionType, PayoutStatus, UtmParams,
};
use crate::storage::helpers::{parse_enum, parse_timestamp};
use crate::storage::schema::{
    AffiliateClicks, AffiliateConversions, AffiliatePayouts, Affiliates, Appointments, Closers,
};
use crate::storage::{Result, StorageError};

pub(super) const AFFILIATE_COLUMNS: [Affiliates; 14] = [
    Affiliates::Id,
    Affiliates::Name,
    Affiliates::Email,
    Affiliates::ReferralCode,
    Affiliates::Tier,
    Affiliates::CommissionRate,
    Affiliates::IsActive,
    Affiliates::CustomLink,
    Affiliates::TotalClicks,
    Affiliates::TotalLeads,
    Affiliates::TotalBookings,
    Affiliates::TotalSales,
    Affiliates::TotalCommissionCents,
    Affiliates::CreatedAt,
];

pub(super) const CLICK_COLUMNS: [AffiliateClicks; 10] = [
    AffiliateClicks::Id,
    AffiliateClicks::AffiliateId,
    AffiliateClicks::ReferralCode,
    AffiliateClicks::IpAddress,
    AffiliateClicks::UserAgent,
    AffiliateClicks::UtmSource,
    AffiliateClicks::UtmMedium,
    AffiliateClicks::UtmCampaign,
    AffiliateClicks::Source,
    AffiliateClicks::CreatedAt,
];

pub(super) const CONVERSION_COLUMNS: [AffiliateConversions; 13] = [
    AffiliateConversions::Id,
    AffiliateConversions::AffiliateId,
    AffiliateConversions::QuizSessionId,
    AffiliateConversions::ConversionType,
    AffiliateConversions::Status,
    AffiliateConversions::CommissionCents,
    AffiliateConversions::SaleValueCents,
    AffiliateConversions::CommissionStatus,
    AffiliateConversions::HoldUntil,
    AffiliateConversions::PayoutId,
    AffiliateConversions::ForfeitReason,
    AffiliateConversions::CommissionUpdatedAt,
    AffiliateConversions::CreatedAt,
];

pub(super) const PAYOUT_COLUMNS: [AffiliatePayouts; 6] = [
    AffiliatePayouts::Id,
    AffiliatePayouts::AffiliateId,
    AffiliatePayouts::AmountDueCents,
    AffiliatePayouts::Status,
    AffiliatePayouts::PaidAt,
    AffiliatePayouts::CreatedAt,
];

pub(super) const CLOSER_COLUMNS: [Closers; 10] = [
    Closers::Id,
    Closers::Name,
    Closers::Email,
    Closers::IsActive,
    Closers::IsApproved,
    Closers::TotalCalls,
    Closers::TotalConversions,
    Closers::TotalRevenueCents,
    Closers::ConversionRate,
    Closers::CreatedAt,
];

pub(super) const APPOINTMENT_COLUMNS: [Appointments; 9] = [
    Appointments::Id,
    Appointments::CustomerName,
    Appointments::CustomerEmail,
    Appointments::ScheduledAt,
    Appointments::Status,
    Appointments::Outcome,
    Appointments::SaleValueCents,
    Appointments::CloserId,
    Appointments::CreatedAt,
];

fn uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Ok(Uuid::parse_str(&raw)?)
}

fn opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let raw: Option<String> = row.try_get(column)?;
    Ok(raw.map(|r| Uuid::parse_str(&r)).transpose()?)
}

fn decimal(table: &'static str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| StorageError::Corrupt {
        table,
        detail: format!("bad decimal {raw:?}: {e}"),
    })
}

pub(super) fn affiliate(row: &SqliteRow) -> Result<Affiliate> {
    const TABLE: &str = "affiliates";
    let tier: String = row.try_get("tier")?;
    let rate: String = row.try_get("commission_rate")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Affiliate {
        id: uuid(row, "id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        referral_code: row.try_get("referral_code")?,
        tier: parse_enum(TABLE, &tier, AffiliateTier::parse)?,
        commission_rate: decimal(TABLE, &rate)?,
        is_active: row.try_get("is_active")?,
        custom_link: row.try_get("custom_link")?,
        counters: AffiliateCounters {
            total_clicks: row.try_get("total_clicks")?,
            total_leads: row.try_get("total_leads")?,
            total_bookings: row.try_get("total_bookings")?,
            total_sales: row.try_get("total_sales")?,
            total_commission: from_cents(row.try_get("total_commission_cents")?),
        },
        created_at: parse_timestamp(TABLE, &created_at)?,
    })
}

pub(super) fn click(row: &SqliteRow) -> Result<AffiliateClick> {
    const TABLE: &str = "affiliate_clicks";
    let source: String = row.try_get("source")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(AffiliateClick {
        id: uuid(row, "id")?,
        affiliate_id: uuid(row, "affiliate_id")?,
        referral_code: row.try_get("referral_code")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        utm: UtmParams {
            source: row.try_get("utm_source")?,
            medium: row.try_get("utm_medium")?,
            campaign: row.try_get("utm_campaign")?,
        },
        source: parse_enum(TABLE, &source, ClickSource::parse)?,
        created_at: parse_timestamp(TABLE, &created_at)?,
    })
}

pub(super) fn conversion(row: &SqliteRow) -> Result<AffiliateConversion> {
    const TABLE: &str = "affiliate_conversions";
    let conversion_type: String = row.try_get("conversion_type")?;
    let status: String = row.try_get("status")?;
    let commission_status: String = row.try_get("commission_status")?;
    let sale_value: Option<i64> = row.try_get("sale_value_cents")?;
    let hold_until: String = row.try_get("hold_until")?;
    let updated_at: String = row.try_get("commission_updated_at")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(AffiliateConversion {
        id: uuid(row, "id")?,
        affiliate_id: uuid(row, "affiliate_id")?,
        quiz_session_id: opt_uuid(row, "quiz_session_id")?,
        conversion_type: parse_enum(TABLE, &conversion_type, ConversionType::parse)?,
        status: parse_enum(TABLE, &status, ConversionStatus::parse)?,
        commission_amount: from_cents(row.try_get("commission_cents")?),
        sale_value: sale_value.map(from_cents),
        commission_status: parse_enum(TABLE, &commission_status, CommissionStatus::parse)?,
        hold_until: parse_timestamp(TABLE, &hold_until)?,
        payout_id: opt_uuid(row, "payout_id")?,
        forfeit_reason: row.try_get("forfeit_reason")?,
        commission_updated_at: parse_timestamp(TABLE, &updated_at)?,
        created_at: parse_timestamp(TABLE, &created_at)?,
    })
}

pub(super) fn payout(row: &SqliteRow) -> Result<AffiliatePayout> {
    const TABLE: &str = "affiliate_payouts";
    let status: String = row.try_get("status")?;
    let paid_at: Option<String> = row.try_get("paid_at")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(AffiliatePayout {
        id: uuid(row, "id")?,
        affiliate_id: uuid(row, "affiliate_id")?,
        amount_due: from_cents(row.try_get("amount_due_cents")?),
        status: parse_enum(TABLE, &status, PayoutStatus::parse)?,
        paid_at: paid_at
            .map(|raw| parse_timestamp(TABLE, &raw))
            .transpose()?,
        created_at: parse_timestamp(TABLE, &created_at)?,
    })
}

pub(super) fn closer(row: &SqliteRow) -> Result<Closer> {
    const TABLE: &str = "closers";
    let rate: String = row.try_get("conversion_rate")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Closer {
        id: uuid(row, "id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        is_active: row.try_get("is_active")?,
        is_approved: row.try_get("is_approved")?,
        total_calls: row.try_get("total_calls")?,
        stats: CloserStats {
            total_conversions: row.try_get("total_conversions")?,
            total_revenue: from_cents(row.try_get("total_revenue_cents")?),
            conversion_rate: decimal(TABLE, &rate)?,
        },
        created_at: parse_timestamp(TABLE, &created_at)?,
    })
}

pub(super) fn appointment(row: &SqliteRow) -> Result<Appointment> {
    const TABLE: &str = "appointments";
    let status: String = row.try_get("status")?;
    let outcome: Option<String> = row.try_get("outcome")?;
    let sale_value: Option<i64> = row.try_get("sale_value_cents")?;
    let scheduled_at: String = row.try_get("scheduled_at")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Appointment {
        id: uuid(row, "id")?,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        scheduled_at: parse_timestamp(TABLE, &scheduled_at)?,
        status: parse_enum(TABLE, &status, AppointmentStatus::parse)?,
        outcome: outcome
            .map(|raw| parse_enum(TABLE, &raw, AppointmentOutcome::parse))
            .transpose()?,
        sale_value: sale_value.map(from_cents),
        closer_id: opt_uuid(row, "closer_id")?,
        created_at: parse_timestamp(TABLE, &created_at)?,
    })
}
