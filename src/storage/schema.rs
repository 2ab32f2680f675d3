//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! Money columns hold integer cents.

use sea_query::Iden;

/// Affiliates table schema.
#[derive(Iden, Clone, Copy)]
pub enum Affiliates {
    Table,
    Id,
    Name,
    Email,
    ReferralCode,
    Tier,
    CommissionRate,
    IsActive,
    CustomLink,
    TotalClicks,
    TotalLeads,
    TotalBookings,
    TotalSales,
    TotalCommissionCents,
    CreatedAt,
}

/// Affiliate clicks table schema.
#[derive(Iden, Clone, Copy)]
pub enum AffiliateClicks {
    Table,
    Id,
    AffiliateId,
    ReferralCode,
    IpAddress,
    UserAgent,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    Source,
    CreatedAt,
}

/// Affiliate conversions table schema.
#[derive(Iden, Clone, Copy)]
pub enum AffiliateConversions {
    Table,
    Id,
    AffiliateId,
    QuizSessionId,
    ConversionType,
    Status,
    CommissionCents,
    SaleValueCents,
    CommissionStatus,
    HoldUntil,
    PayoutId,
    ForfeitReason,
    CommissionUpdatedAt,
    CreatedAt,
}

/// Affiliate payouts table schema.
#[derive(Iden, Clone, Copy)]
pub enum AffiliatePayouts {
    Table,
    Id,
    AffiliateId,
    AmountDueCents,
    Status,
    PaidAt,
    CreatedAt,
}

/// Closers table schema.
#[derive(Iden, Clone, Copy)]
pub enum Closers {
    Table,
    Id,
    Name,
    Email,
    IsActive,
    IsApproved,
    TotalCalls,
    TotalConversions,
    TotalRevenueCents,
    ConversionRate,
    CreatedAt,
}

/// Appointments table schema.
#[derive(Iden, Clone, Copy)]
pub enum Appointments {
    Table,
    Id,
    CustomerName,
    CustomerEmail,
    ScheduledAt,
    Status,
    Outcome,
    SaleValueCents,
    CloserId,
    CreatedAt,
}

/// SQL for creating the affiliate program tables.
pub const CREATE_LEDGER_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS affiliates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    referral_code TEXT NOT NULL UNIQUE,
    tier TEXT NOT NULL,
    commission_rate TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    custom_link TEXT,
    total_clicks INTEGER NOT NULL DEFAULT 0,
    total_leads INTEGER NOT NULL DEFAULT 0,
    total_bookings INTEGER NOT NULL DEFAULT 0,
    total_sales INTEGER NOT NULL DEFAULT 0,
    total_commission_cents INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS affiliate_clicks (
    id TEXT PRIMARY KEY,
    affiliate_id TEXT NOT NULL REFERENCES affiliates(id),
    referral_code TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    user_agent TEXT NOT NULL,
    utm_source TEXT,
    utm_medium TEXT,
    utm_campaign TEXT,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_clicks_fingerprint
    ON affiliate_clicks(affiliate_id, user_agent, created_at);

CREATE TABLE IF NOT EXISTS affiliate_conversions (
    id TEXT PRIMARY KEY,
    affiliate_id TEXT NOT NULL REFERENCES affiliates(id),
    quiz_session_id TEXT,
    conversion_type TEXT NOT NULL,
    status TEXT NOT NULL,
    commission_cents INTEGER NOT NULL DEFAULT 0,
    sale_value_cents INTEGER,
    commission_status TEXT NOT NULL,
    hold_until TEXT NOT NULL,
    payout_id TEXT,
    forfeit_reason TEXT,
    commission_updated_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversions_affiliate_type
    ON affiliate_conversions(affiliate_id, conversion_type, created_at);
CREATE INDEX IF NOT EXISTS idx_conversions_hold
    ON affiliate_conversions(commission_status, hold_until);

CREATE TABLE IF NOT EXISTS affiliate_payouts (
    id TEXT PRIMARY KEY,
    affiliate_id TEXT NOT NULL REFERENCES affiliates(id),
    amount_due_cents INTEGER NOT NULL,
    status TEXT NOT NULL,
    paid_at TEXT,
    created_at TEXT NOT NULL
);
"#;

/// SQL for creating the closer CRM tables.
pub const CREATE_ROSTER_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS closers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_approved INTEGER NOT NULL DEFAULT 0,
    total_calls INTEGER NOT NULL DEFAULT 0,
    total_conversions INTEGER NOT NULL DEFAULT 0,
    total_revenue_cents INTEGER NOT NULL DEFAULT 0,
    conversion_rate TEXT NOT NULL DEFAULT '0',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    customer_name TEXT NOT NULL,
    customer_email TEXT NOT NULL,
    scheduled_at TEXT NOT NULL,
    status TEXT NOT NULL,
    outcome TEXT,
    sale_value_cents INTEGER,
    closer_id TEXT REFERENCES closers(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_unassigned
    ON appointments(closer_id, status, scheduled_at);
"#;
