//! Affiliate program storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::model::{
    Affiliate, AffiliateClick, AffiliateConversion, AffiliateCounters, AffiliatePayout,
    CommissionStatus, PayoutStatus,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A row with the same key or unique value already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },

    #[error("Amount out of range: {0}")]
    Overflow(Decimal),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a deduplicated insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written and counters incremented.
    Inserted,
    /// A matching row exists inside the window; nothing written.
    Duplicate,
}

/// Conditional commission update applied to a set of conversions.
///
/// Applied all-or-nothing: every conversion must currently be in one of
/// `expected`, otherwise no row changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionTransition {
    pub ids: Vec<Uuid>,
    pub expected: Vec<CommissionStatus>,
    pub target: CommissionStatus,
    /// Stored as the forfeit reason when `target` is `Forfeited`.
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Every conversion moved to the target status.
    Applied(usize),
    /// A referenced conversion does not exist.
    Missing(Uuid),
    /// A conversion was not in an expected status.
    Rejected { id: Uuid, current: CommissionStatus },
}

/// Outcome of settling commissions against a completed payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleResult {
    Applied(usize),
    PayoutMissing,
    PayoutNotCompleted(PayoutStatus),
    ConversionMissing(Uuid),
    /// Conversion belongs to a different affiliate than the payout.
    AffiliateMismatch(Uuid),
    NotAvailable { id: Uuid, current: CommissionStatus },
    /// Settling would attribute more commission to the payout than it paid.
    ExceedsPayout {
        already_settled: Decimal,
        requested: Decimal,
        amount_due: Decimal,
    },
}

/// Payout sums for one affiliate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutTotals {
    /// Sum over `completed` payouts.
    pub completed: Decimal,
    /// Sum over `pending` and `processing` payouts.
    pub in_flight: Decimal,
}

/// Interface for affiliate program persistence.
///
/// Every method that writes more than one row is transactional. Counter
/// changes are applied as store-level increments, never read-modify-write.
///
/// Implementations:
/// - `SqliteLedgerStore`: SQLite storage
/// - `MockLedgerStore`: In-memory mock for testing
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_affiliate(&self, affiliate: &Affiliate) -> Result<()>;

    async fn get_affiliate(&self, id: Uuid) -> Result<Option<Affiliate>>;

    async fn find_affiliate_by_code(&self, referral_code: &str) -> Result<Option<Affiliate>>;

    async fn list_affiliates(&self) -> Result<Vec<Affiliate>>;

    /// Insert a click unless one with the same affiliate and user agent was
    /// created at or after `dedupe_since`. Increments `total_clicks` on insert.
    async fn insert_click(
        &self,
        click: &AffiliateClick,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome>;

    async fn list_clicks(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateClick>>;

    /// Insert a conversion unless one of the same type for the same affiliate
    /// was created at or after `dedupe_since`. On insert, increments the
    /// counter for the conversion type and adds the commission to
    /// `total_commission`.
    async fn insert_conversion(
        &self,
        conversion: &AffiliateConversion,
        dedupe_since: DateTime<Utc>,
    ) -> Result<InsertOutcome>;

    async fn get_conversion(&self, id: Uuid) -> Result<Option<AffiliateConversion>>;

    async fn list_conversions(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateConversion>>;

    /// Move every `held` commission whose hold has elapsed at `now` to
    /// `available`. Returns the released conversion ids.
    async fn release_due_commissions(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>>;

    /// Conditionally move a set of commissions to a new status.
    ///
    /// Forfeiting subtracts the commission from the affiliate's cached
    /// `total_commission` in the same transaction.
    async fn transition_commissions(
        &self,
        transition: &CommissionTransition,
    ) -> Result<TransitionResult>;

    /// Mark `available` commissions as `paid` by a completed payout.
    async fn settle_commissions(
        &self,
        ids: &[Uuid],
        payout_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SettleResult>;

    async fn insert_payout(&self, payout: &AffiliatePayout) -> Result<()>;

    async fn get_payout(&self, id: Uuid) -> Result<Option<AffiliatePayout>>;

    async fn list_payouts(&self, affiliate_id: Uuid) -> Result<Vec<AffiliatePayout>>;

    async fn update_payout_status(
        &self,
        id: Uuid,
        status: PayoutStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn payout_totals(&self, affiliate_id: Uuid) -> Result<PayoutTotals>;

    /// Lifetime sum of commission for an affiliate, excluding forfeited
    /// commissions and cancelled conversions.
    async fn commission_total(&self, affiliate_id: Uuid) -> Result<Decimal>;

    /// Recompute an affiliate's counters from click and conversion rows.
    async fn recount_affiliate(&self, id: Uuid) -> Result<AffiliateCounters>;

    async fn overwrite_affiliate_counters(
        &self,
        id: Uuid,
        counters: &AffiliateCounters,
    ) -> Result<()>;
}
