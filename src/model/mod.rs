//! Records of the affiliate program and the closer CRM.
//!
//! Every record serializes to JSON as-is for the HTTP handlers that sit in
//! front of this crate.

pub mod money;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Defines a unit enum with a stable snake_case storage representation.
macro_rules! stored_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Value written to the store.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse a stored value.
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_enum! {
    /// Affiliate program tier; selects the default commission rate.
    pub enum AffiliateTier {
        Bronze => "bronze",
        Silver => "silver",
        Gold => "gold",
    }
}

stored_enum! {
    /// Where a tracked visit came from. Each source has its own dedup window.
    pub enum ClickSource {
        Redirect => "redirect",
        Homepage => "homepage",
    }
}

stored_enum! {
    /// Qualifying action attributed to an affiliate.
    pub enum ConversionType {
        QuizCompletion => "quiz_completion",
        Booking => "booking",
        Sale => "sale",
    }
}

stored_enum! {
    pub enum ConversionStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
}

stored_enum! {
    /// Commission lifecycle state. Transitions live in
    /// [`crate::services::commission`].
    pub enum CommissionStatus {
        Held => "held",
        Available => "available",
        Paid => "paid",
        Forfeited => "forfeited",
    }
}

stored_enum! {
    pub enum PayoutStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

stored_enum! {
    pub enum AppointmentStatus {
        Scheduled => "scheduled",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

stored_enum! {
    /// What the closer recorded after the call.
    pub enum AppointmentOutcome {
        Sale => "sale",
        NoSale => "no_sale",
        FollowUp => "follow_up",
        NoShow => "no_show",
    }
}

stored_enum! {
    pub enum PayoutSchedule {
        Weekly => "weekly",
        Biweekly => "biweekly",
        Monthly => "monthly",
    }
}

impl ConversionType {
    /// Whether this type of conversion ever earns commission.
    pub fn earns_commission(&self) -> bool {
        !matches!(self, Self::Booking)
    }
}

impl AppointmentStatus {
    /// Statuses an appointment may be in while waiting for a closer.
    pub const ASSIGNABLE: [AppointmentStatus; 2] = [Self::Scheduled, Self::Confirmed];

    pub fn is_assignable(&self) -> bool {
        Self::ASSIGNABLE.contains(self)
    }
}

/// Cached per-affiliate counters.
///
/// Write-through cache over the click and conversion rows: live traffic
/// increments them, `sync` recomputes them from source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateCounters {
    pub total_clicks: i64,
    pub total_leads: i64,
    pub total_bookings: i64,
    pub total_sales: i64,
    pub total_commission: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affiliate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub referral_code: String,
    pub tier: AffiliateTier,
    /// Fraction of sale value paid as commission (`0.10` = 10%).
    pub commission_rate: Decimal,
    pub is_active: bool,
    /// Custom tracking link. Once set, the referral-code path is disabled.
    pub custom_link: Option<String>,
    #[serde(flatten)]
    pub counters: AffiliateCounters,
    pub created_at: DateTime<Utc>,
}

impl Affiliate {
    /// New active affiliate with zeroed counters.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        referral_code: impl Into<String>,
        tier: AffiliateTier,
        commission_rate: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            referral_code: referral_code.into(),
            tier,
            commission_rate,
            is_active: true,
            custom_link: None,
            counters: AffiliateCounters::default(),
            created_at,
        }
    }
}

/// UTM attribution parameters carried by a tracked visit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
}

/// One attributable visit. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateClick {
    pub id: Uuid,
    pub affiliate_id: Uuid,
    pub referral_code: String,
    pub ip_address: String,
    pub user_agent: String,
    pub utm: UtmParams,
    pub source: ClickSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateConversion {
    pub id: Uuid,
    pub affiliate_id: Uuid,
    pub quiz_session_id: Option<Uuid>,
    pub conversion_type: ConversionType,
    pub status: ConversionStatus,
    pub commission_amount: Decimal,
    pub sale_value: Option<Decimal>,
    pub commission_status: CommissionStatus,
    /// Written once at creation; never extended.
    pub hold_until: DateTime<Utc>,
    /// Completed payout that settled this commission.
    pub payout_id: Option<Uuid>,
    pub forfeit_reason: Option<String>,
    pub commission_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliatePayout {
    pub id: Uuid,
    pub affiliate_id: Uuid,
    pub amount_due: Decimal,
    pub status: PayoutStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AffiliatePayout {
    pub fn new(affiliate_id: Uuid, amount_due: Decimal, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            affiliate_id,
            amount_due,
            status: PayoutStatus::Pending,
            paid_at: None,
            created_at,
        }
    }
}

/// A booked sales call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub outcome: Option<AppointmentOutcome>,
    pub sale_value: Option<Decimal>,
    pub closer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// New unassigned appointment in `scheduled` status.
    pub fn new(
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        scheduled_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            scheduled_at,
            status: AppointmentStatus::Scheduled,
            outcome: None,
            sale_value: None,
            closer_id: None,
            created_at,
        }
    }
}

/// Derived closer performance figures, recomputable from appointments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloserStats {
    pub total_conversions: i64,
    pub total_revenue: Decimal,
    /// Percentage of calls with an outcome that closed, two decimal places.
    pub conversion_rate: Decimal,
}

impl CloserStats {
    /// Build stats from raw appointment aggregates. `held_calls` counts calls
    /// that took place (any outcome except no-show).
    pub fn from_counts(total_conversions: i64, total_revenue: Decimal, held_calls: i64) -> Self {
        let conversion_rate = if held_calls == 0 {
            Decimal::ZERO
        } else {
            money::round_cents(
                Decimal::from(total_conversions) * Decimal::ONE_HUNDRED
                    / Decimal::from(held_calls),
            )
        };
        Self {
            total_conversions,
            total_revenue,
            conversion_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Closer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub is_approved: bool,
    /// Running call count; the round-robin load.
    pub total_calls: i64,
    #[serde(flatten)]
    pub stats: CloserStats,
    pub created_at: DateTime<Utc>,
}

impl Closer {
    /// New active, approved closer with no calls.
    pub fn new(name: impl Into<String>, email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            is_active: true,
            is_approved: true,
            total_calls: 0,
            stats: CloserStats::default(),
            created_at,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.is_active && self.is_approved
    }
}
