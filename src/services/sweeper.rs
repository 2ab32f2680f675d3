//! Periodic commission release and closer assignment.
//!
//! Runs as a separate process (`ledger-sweep`), either as a cron-style single
//! pass or as a long-running daemon.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use super::{CloserScheduler, CommissionManager, LedgerError};
use crate::clock::Clock;
use crate::config::SweepConfig;

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub released: usize,
    pub assigned: usize,
    /// Appointments left waiting because no closer was eligible.
    pub waiting_for_closers: bool,
}

/// Releases due commissions and, optionally, assigns waiting appointments.
pub struct CommissionSweeper {
    commissions: CommissionManager,
    scheduler: Option<CloserScheduler>,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
}

impl CommissionSweeper {
    /// Create a sweeper. Pass `None` for `scheduler` to skip assignment.
    pub fn new(
        commissions: CommissionManager,
        scheduler: Option<CloserScheduler>,
        clock: Arc<dyn Clock>,
        config: &SweepConfig,
    ) -> Self {
        Self {
            commissions,
            scheduler,
            clock,
            check_interval: Duration::from_secs(config.interval_secs.max(1)),
        }
    }

    /// One pass. `NoEligibleClosers` is reported, not returned.
    pub async fn sweep_once(&self) -> Result<SweepReport, LedgerError> {
        let release = self.commissions.release_due(self.clock.now()).await?;
        let mut report = SweepReport {
            released: release.count(),
            ..Default::default()
        };

        if let Some(scheduler) = &self.scheduler {
            match scheduler.assign_unassigned().await {
                Ok(assignment) => report.assigned = assignment.assigned.len(),
                Err(LedgerError::NoEligibleClosers) => report.waiting_for_closers = true,
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Run the sweep loop.
    ///
    /// This runs indefinitely; a failed pass is logged and retried on the
    /// next tick.
    pub async fn run(&self) {
        info!(
            check_interval = ?self.check_interval,
            assign_closers = self.scheduler.is_some(),
            "Starting commission sweeper"
        );

        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.sweep_once().await {
                Ok(report) => {
                    if report.waiting_for_closers {
                        warn!("Appointments waiting with no eligible closers");
                    }
                    if report.released > 0 || report.assigned > 0 {
                        info!(
                            released = report.released,
                            assigned = report.assigned,
                            "Sweep complete"
                        );
                    }
                }
                Err(e) => {
                    error!(error = %e, "Sweep failed");
                }
            }
        }
    }
}
