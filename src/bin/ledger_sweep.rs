//! ledger-sweep: commission release and closer assignment job
//!
//! Releases held commissions whose hold has ended and hands waiting
//! appointments to closers.
//!
//! ## Configuration
//! - LEDGER_CONFIG: Path to a YAML config file (optional)
//! - LEDGER__*: Overrides for individual settings (e.g. LEDGER__SWEEP__INTERVAL_SECS)
//! - LEDGER_SWEEP_ONCE: Set to `1` to run a single pass, print the report as
//!   JSON and exit (for cron)
//! - LEDGER_LOG: Log filter (default: info)

use std::sync::Arc;

use tracing::{error, info};

use affiliate_ledger::clock::{Clock, SystemClock};
use affiliate_ledger::config::{Config, SWEEP_ONCE_ENV_VAR};
use affiliate_ledger::services::{CloserScheduler, CommissionManager, CommissionSweeper};
use affiliate_ledger::storage::init_storage;
use affiliate_ledger::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let (ledger, roster) = init_storage(&config.storage).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let scheduler = config
        .sweep
        .assign_closers
        .then(|| CloserScheduler::new(roster));
    let sweeper = CommissionSweeper::new(
        CommissionManager::new(ledger, clock.clone()),
        scheduler,
        clock,
        &config.sweep,
    );

    let once = std::env::var(SWEEP_ONCE_ENV_VAR)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if once {
        let report = sweeper.sweep_once().await?;
        info!(
            released = report.released,
            assigned = report.assigned,
            "Single sweep complete"
        );
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    tokio::select! {
        _ = sweeper.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
