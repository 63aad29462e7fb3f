//! Background jobs for the server: scheduled alert checks and cache sweeps.

use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

/// Expired cache entries are swept this often.
const CACHE_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Initial delay before the first alert check, so startup is not slowed by it.
const INITIAL_DELAY_SECS: u64 = 5;

/// Starts the scheduled alert check across all users.
pub fn start_alert_scheduler(state: Arc<AppState>, every: Duration) {
    tokio::spawn(async move {
        info!("Alert scheduler started ({}s interval)", every.as_secs());
        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_scheduled_check(&state).await;
        }
    });
}

/// Runs a single scheduled alert check.
async fn run_scheduled_check(state: &Arc<AppState>) {
    match state.alert_monitor.run_full_cycle().await {
        Ok(summary) if summary.triggered_count > 0 => info!(
            "Scheduled alert check: {} checked, {} triggered",
            summary.checked_count, summary.triggered_count
        ),
        Ok(summary) => debug!(
            "Scheduled alert check: {} checked, none triggered",
            summary.checked_count
        ),
        Err(e) => warn!("Scheduled alert check failed: {}", e),
    }
}

/// Starts the periodic sweep of expired market data cache entries.
pub fn start_cache_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(CACHE_SWEEP_INTERVAL_SECS));
        // the first tick completes immediately and there is nothing to sweep yet
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = state.market_data.cache().purge_expired();
            debug!(
                "Cache sweep removed {} expired entries, {} remain",
                removed,
                state.market_data.cache().len()
            );
        }
    });
}
