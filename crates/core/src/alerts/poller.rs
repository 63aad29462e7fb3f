//! Client-side poll loop.
//!
//! Re-evaluates one user's alerts on a cadence that follows market hours:
//! short while the session is open, long while it is closed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use pricewatch_market_data::market_hours::{
    is_market_open_at, CLOSED_POLL_INTERVAL, OPEN_POLL_INTERVAL,
};
use tokio::task::JoinHandle;

use super::monitor::{AlertMonitor, CycleSummary};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    pub open_interval: Duration,
    pub closed_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            open_interval: OPEN_POLL_INTERVAL,
            closed_interval: CLOSED_POLL_INTERVAL,
        }
    }
}

impl PollerConfig {
    pub fn interval_at(&self, now: DateTime<Utc>) -> Duration {
        if is_market_open_at(now) {
            self.open_interval
        } else {
            self.closed_interval
        }
    }
}

pub struct AlertPoller {
    monitor: Arc<AlertMonitor>,
    user_id: String,
    config: PollerConfig,
}

impl AlertPoller {
    pub fn new(monitor: Arc<AlertMonitor>, user_id: impl Into<String>, config: PollerConfig) -> Self {
        Self {
            monitor,
            user_id: user_id.into(),
            config,
        }
    }

    /// One cycle; failures are logged and count as an empty cycle.
    pub async fn poll_once(&self) -> CycleSummary {
        match self.monitor.run_user_cycle(&self.user_id).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Alert poll for {} failed: {}", self.user_id, e);
                CycleSummary::default()
            }
        }
    }

    /// Run until the returned handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.poll_once().await;
                let interval = self.config.interval_at(Utc::now());
                debug!("Next alert poll for {} in {:?}", self.user_id, interval);
                tokio::time::sleep(interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::alerts_model::{Alert, AlertCondition, AlertDirection};
    use crate::alerts::test_support::InMemoryAlertRepository;
    use crate::notifications::MockNotifier;
    use chrono::TimeZone;
    use pricewatch_market_data::{MarketDataClient, MarketDataConfig};
    use rust_decimal_macros::dec;

    fn poller(repository: Arc<InMemoryAlertRepository>, notifier: MockNotifier) -> AlertPoller {
        let market_data =
            Arc::new(MarketDataClient::from_api_key(None, MarketDataConfig::default()).unwrap());
        let monitor = Arc::new(AlertMonitor::new(repository, market_data, Arc::new(notifier)));
        AlertPoller::new(monitor, "u1", PollerConfig::default())
    }

    fn googl_alert() -> Alert {
        Alert {
            id: "g1".to_string(),
            user_id: "u1".to_string(),
            symbol: "GOOGL".to_string(),
            direction: AlertDirection::Rise,
            condition: AlertCondition::Absolute {
                target_price: dec!(175),
            },
            triggered: false,
            triggered_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_interval_follows_market_hours() {
        let config = PollerConfig::default();
        // Wednesday 15:00 UTC = 10:00 EST
        let open = Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap();
        // Saturday
        let closed = Utc.with_ymd_and_hms(2024, 1, 13, 15, 0, 0).unwrap();

        assert_eq!(config.interval_at(open), Duration::from_secs(15));
        assert_eq!(config.interval_at(closed), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_poll_once() {
        let repository = Arc::new(InMemoryAlertRepository::with_alerts(vec![googl_alert()]));
        let notifier = MockNotifier::new();
        let poller = poller(repository.clone(), notifier.clone());

        let summary = poller.poll_once().await;
        assert_eq!(summary.triggered_count, 1);
        assert_eq!(notifier.delivered()[0].tag, "alert-g1");

        assert_eq!(poller.poll_once().await, CycleSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_polls_and_can_be_aborted() {
        let repository = Arc::new(InMemoryAlertRepository::with_alerts(vec![googl_alert()]));
        let notifier = MockNotifier::new();
        let handle = poller(repository.clone(), notifier.clone()).spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(notifier.len(), 1);
        assert!(repository.all()[0].triggered);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
