//! Affiliate program and tracking settings.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::model::{AffiliateTier, ClickSource, PayoutSchedule};

/// Default commission hold, in days.
pub const DEFAULT_COMMISSION_HOLD_DAYS: i64 = 30;
/// Default dedup window for link-redirect clicks (1 hour).
pub const DEFAULT_REDIRECT_DEDUP_SECS: i64 = 60 * 60;
/// Default dedup window for raw homepage clicks (2 minutes).
pub const DEFAULT_HOMEPAGE_DEDUP_SECS: i64 = 2 * 60;
/// Default window in which a repeated conversion is treated as a client retry.
pub const DEFAULT_CONVERSION_DEDUP_SECS: i64 = 30;

/// Commission program settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Days a new commission is held before it can be released.
    pub commission_hold_days: i64,
    /// Smallest available balance an affiliate can be paid out.
    pub minimum_payout: Decimal,
    pub payout_schedule: PayoutSchedule,
    /// Default commission rate per tier.
    pub tier_rates: TierRates,
}

impl ProgramConfig {
    pub fn hold_period(&self) -> Duration {
        Duration::days(self.commission_hold_days)
    }

    /// Default commission rate for a newly enrolled affiliate of `tier`.
    pub fn default_rate(&self, tier: AffiliateTier) -> Decimal {
        match tier {
            AffiliateTier::Bronze => self.tier_rates.bronze,
            AffiliateTier::Silver => self.tier_rates.silver,
            AffiliateTier::Gold => self.tier_rates.gold,
        }
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            commission_hold_days: DEFAULT_COMMISSION_HOLD_DAYS,
            minimum_payout: Decimal::new(50, 0),
            payout_schedule: PayoutSchedule::Monthly,
            tier_rates: TierRates::default(),
        }
    }
}

/// Commission rate per affiliate tier, as fractions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TierRates {
    pub bronze: Decimal,
    pub silver: Decimal,
    pub gold: Decimal,
}

impl Default for TierRates {
    fn default() -> Self {
        Self {
            bronze: Decimal::new(10, 2),
            silver: Decimal::new(15, 2),
            gold: Decimal::new(20, 2),
        }
    }
}

/// Click and conversion deduplication windows.
///
/// Redirect and homepage traffic keep separate windows; there is no single
/// agreed business rule behind the two values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub redirect_dedup_window_secs: i64,
    pub homepage_dedup_window_secs: i64,
    pub conversion_dedup_window_secs: i64,
}

impl TrackingConfig {
    /// Dedup window applied to clicks from `source`.
    pub fn click_window(&self, source: ClickSource) -> Duration {
        match source {
            ClickSource::Redirect => Duration::seconds(self.redirect_dedup_window_secs),
            ClickSource::Homepage => Duration::seconds(self.homepage_dedup_window_secs),
        }
    }

    pub fn conversion_window(&self) -> Duration {
        Duration::seconds(self.conversion_dedup_window_secs)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            redirect_dedup_window_secs: DEFAULT_REDIRECT_DEDUP_SECS,
            homepage_dedup_window_secs: DEFAULT_HOMEPAGE_DEDUP_SECS,
            conversion_dedup_window_secs: DEFAULT_CONVERSION_DEDUP_SECS,
        }
    }
}
