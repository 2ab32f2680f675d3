//! Commission state machine.
//!
//! ```text
//! held ──HoldElapsed / ForceRelease──> available ──Settle──> paid
//!   │                                     │
//!   └──────────────Forfeit────────────────┴──> forfeited
//! ```
//!
//! Every transition is forward-only. Stores apply a transition as a
//! conditional update guarded by [`CommissionEvent::sources`].

use crate::model::CommissionStatus;

/// Something that moves a commission through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommissionEvent {
    /// The hold period passed.
    HoldElapsed,
    /// An admin released the hold early.
    ForceRelease,
    /// A completed payout covered the commission.
    Settle,
    /// Fraud or chargeback confirmed.
    Forfeit,
}

impl CommissionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HoldElapsed => "hold_elapsed",
            Self::ForceRelease => "force_release",
            Self::Settle => "settle",
            Self::Forfeit => "forfeit",
        }
    }

    /// Statuses this event may be applied to.
    pub fn sources(&self) -> &'static [CommissionStatus] {
        match self {
            Self::HoldElapsed | Self::ForceRelease => &[CommissionStatus::Held],
            Self::Settle => &[CommissionStatus::Available],
            Self::Forfeit => &[CommissionStatus::Held, CommissionStatus::Available],
        }
    }

    /// Status after the event.
    pub fn target(&self) -> CommissionStatus {
        match self {
            Self::HoldElapsed | Self::ForceRelease => CommissionStatus::Available,
            Self::Settle => CommissionStatus::Paid,
            Self::Forfeit => CommissionStatus::Forfeited,
        }
    }
}

impl std::fmt::Display for CommissionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event applied to a status it does not leave from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {event} to a {from} commission")]
pub struct IllegalTransition {
    pub from: CommissionStatus,
    pub event: CommissionEvent,
}

impl CommissionStatus {
    /// Status after `event`, or the reason it cannot happen.
    pub fn apply(self, event: CommissionEvent) -> Result<CommissionStatus, IllegalTransition> {
        if event.sources().contains(&self) {
            Ok(event.target())
        } else {
            Err(IllegalTransition { from: self, event })
        }
    }

    /// Paid and forfeited commissions never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Forfeited)
    }
}
