//! Evaluation cycle: fetch quotes, evaluate, mark triggered, notify.
//!
//! Two independent callers drive cycles: the server's scheduled job and the
//! client poll loop. They do not coordinate. At-most-once triggering comes
//! from the repository's conditional `mark_triggered`; the two paths differ
//! only in when they notify (see [`NotifyPolicy`]).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use pricewatch_market_data::{canonical_symbol, MarketDataClient};
use serde::Serialize;

use super::alerts_model::Alert;
use super::alerts_traits::{AlertMonitorTrait, AlertRepositoryTrait};
use super::evaluator::{evaluate, AlertTrigger, PricePoint};
use crate::errors::Result;
use crate::notifications::Notifier;

/// When a fired alert produces a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyPolicy {
    /// Notify only if this cycle performed the untriggered -> triggered
    /// transition. Used by the server job.
    OnTransition,
    /// Notify whenever the condition holds, then mark. Used by the client
    /// loop; a concurrent server job may notify for the same alert too.
    Always,
}

/// Outcome of one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    /// Untriggered alerts considered
    pub checked_count: usize,
    /// Alerts that fired and were acted on
    pub triggered_count: usize,
}

pub struct AlertMonitor {
    repository: Arc<dyn AlertRepositoryTrait>,
    market_data: Arc<MarketDataClient>,
    notifier: Arc<dyn Notifier>,
}

impl AlertMonitor {
    pub fn new(
        repository: Arc<dyn AlertRepositoryTrait>,
        market_data: Arc<MarketDataClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            market_data,
            notifier,
        }
    }

    /// Evaluate the active alerts of one user, client-style.
    pub async fn run_user_cycle(&self, user_id: &str) -> Result<CycleSummary> {
        let alerts = self.repository.list_active(user_id)?;
        Ok(self.process(alerts, NotifyPolicy::Always).await)
    }

    /// Evaluate `alerts` against fresh quotes and act on every trigger.
    pub async fn process(&self, alerts: Vec<Alert>, policy: NotifyPolicy) -> CycleSummary {
        let alerts: Vec<Alert> = alerts.into_iter().filter(|alert| !alert.triggered).collect();
        let mut summary = CycleSummary {
            checked_count: alerts.len(),
            triggered_count: 0,
        };
        if alerts.is_empty() {
            return summary;
        }

        let mut symbols: Vec<&str> = Vec::new();
        for alert in &alerts {
            if !symbols.contains(&alert.symbol.as_str()) {
                symbols.push(&alert.symbol);
            }
        }

        let batch = self.market_data.get_quotes(symbols.as_slice()).await;
        if !batch.missing.is_empty() {
            debug!("No quotes this cycle for {:?}", batch.missing);
        }
        let prices: Vec<PricePoint> = batch.quotes.iter().map(PricePoint::from).collect();

        for trigger in evaluate(&prices, &alerts) {
            if self.act_on(&trigger, policy).await {
                summary.triggered_count += 1;
            }
        }

        info!(
            "Alert cycle checked {} alerts on {} symbols, {} triggered",
            summary.checked_count,
            symbols.len(),
            summary.triggered_count
        );
        summary
    }

    async fn act_on(&self, trigger: &AlertTrigger, policy: NotifyPolicy) -> bool {
        match policy {
            NotifyPolicy::OnTransition => {
                match self
                    .repository
                    .mark_triggered(&trigger.alert_id, Utc::now())
                    .await
                {
                    Ok(true) => {
                        info!("Alert {} triggered: {}", trigger.alert_id, trigger.message);
                        self.notifier.deliver(trigger.notification());
                        true
                    }
                    Ok(false) => {
                        debug!("Alert {} already triggered elsewhere", trigger.alert_id);
                        false
                    }
                    Err(e) => {
                        error!("Failed to mark alert {} triggered: {}", trigger.alert_id, e);
                        false
                    }
                }
            }
            NotifyPolicy::Always => {
                info!("Alert {} triggered: {}", trigger.alert_id, trigger.message);
                self.notifier.deliver(trigger.notification());
                if let Err(e) = self
                    .repository
                    .mark_triggered(&trigger.alert_id, Utc::now())
                    .await
                {
                    warn!("Failed to mark alert {} triggered: {}", trigger.alert_id, e);
                }
                true
            }
        }
    }
}

#[async_trait]
impl AlertMonitorTrait for AlertMonitor {
    async fn run_evaluation_cycle(&self, symbols: &[String]) -> Result<CycleSummary> {
        let wanted: HashSet<String> = symbols.iter().map(|s| canonical_symbol(s)).collect();
        let alerts = self
            .repository
            .list_untriggered()?
            .into_iter()
            .filter(|alert| wanted.contains(&alert.symbol))
            .collect();
        Ok(self.process(alerts, NotifyPolicy::OnTransition).await)
    }

    async fn run_full_cycle(&self) -> Result<CycleSummary> {
        let alerts = self.repository.list_untriggered()?;
        Ok(self.process(alerts, NotifyPolicy::OnTransition).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::alerts_model::{AlertCondition, AlertDirection};
    use crate::alerts::test_support::InMemoryAlertRepository;
    use crate::notifications::MockNotifier;
    use pricewatch_market_data::MarketDataConfig;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn alert(id: &str, symbol: &str, direction: AlertDirection, condition: AlertCondition) -> Alert {
        Alert {
            id: id.to_string(),
            user_id: "u1".to_string(),
            symbol: symbol.to_string(),
            direction,
            condition,
            triggered: false,
            triggered_at: None,
            created_at: Utc::now(),
        }
    }

    fn percent(id: &str, symbol: &str, pct: Decimal, baseline: Decimal) -> Alert {
        alert(
            id,
            symbol,
            AlertDirection::Rise,
            AlertCondition::Percent {
                percent: pct,
                baseline,
            },
        )
    }

    fn demo_client() -> Arc<MarketDataClient> {
        Arc::new(MarketDataClient::from_api_key(None, MarketDataConfig::default()).unwrap())
    }

    fn monitor(
        repository: Arc<InMemoryAlertRepository>,
        notifier: MockNotifier,
    ) -> AlertMonitor {
        AlertMonitor::new(repository, demo_client(), Arc::new(notifier))
    }

    #[tokio::test]
    async fn test_demo_aapl_percent_alert_fires() {
        let repository = Arc::new(InMemoryAlertRepository::with_alerts(vec![percent(
            "a1",
            "AAPL",
            dec!(0.5),
            dec!(226.4),
        )]));
        let notifier = MockNotifier::new();
        let monitor = monitor(repository.clone(), notifier.clone());

        let summary = monitor
            .run_evaluation_cycle(&["aapl".to_string()])
            .await
            .unwrap();
        assert_eq!(
            summary,
            CycleSummary {
                checked_count: 1,
                triggered_count: 1
            }
        );

        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].title, "AAPL Alert");
        assert_eq!(delivered[0].tag, "alert-a1");
        assert_eq!(delivered[0].body, "AAPL is up 0.9% from $226.40 to $228.50");
        assert!(repository.all()[0].triggered);

        // triggered alerts are not evaluated again
        let summary = monitor.run_full_cycle().await.unwrap();
        assert_eq!(summary, CycleSummary::default());
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_unmet_and_unlisted_alerts_stay_untriggered() {
        let repository = Arc::new(InMemoryAlertRepository::with_alerts(vec![
            // demo TSLA is down on the day
            percent("a1", "TSLA", dec!(1), dec!(251.7)),
            // not part of the requested symbols
            percent("a2", "AAPL", dec!(0.5), dec!(226.4)),
        ]));
        let notifier = MockNotifier::new();
        let monitor = monitor(repository.clone(), notifier.clone());

        let summary = monitor
            .run_evaluation_cycle(&["TSLA".to_string()])
            .await
            .unwrap();
        assert_eq!(summary.checked_count, 1);
        assert_eq!(summary.triggered_count, 0);
        assert!(notifier.is_empty());
        assert!(repository.all().iter().all(|alert| !alert.triggered));
    }

    #[tokio::test]
    async fn test_concurrent_server_cycles_trigger_once() {
        let repository = Arc::new(InMemoryAlertRepository::with_alerts(vec![alert(
            "a1",
            "MSFT",
            AlertDirection::Rise,
            AlertCondition::Absolute {
                target_price: dec!(400),
            },
        )]));
        let notifier = MockNotifier::new();
        let first = monitor(repository.clone(), notifier.clone());
        let second = monitor(repository.clone(), notifier.clone());

        let (a, b) = tokio::join!(first.run_full_cycle(), second.run_full_cycle());
        let triggered = a.unwrap().triggered_count + b.unwrap().triggered_count;

        assert_eq!(triggered, 1);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_client_path_notifies_then_marks() {
        let repository = Arc::new(InMemoryAlertRepository::with_alerts(vec![alert(
            "a1",
            "AMZN",
            AlertDirection::Drop,
            AlertCondition::Absolute {
                target_price: dec!(198.5),
            },
        )]));
        let notifier = MockNotifier::new();
        let monitor = monitor(repository.clone(), notifier.clone());

        let summary = monitor.run_user_cycle("u1").await.unwrap();
        assert_eq!(summary.triggered_count, 1);
        assert_eq!(
            notifier.delivered()[0].body,
            "AMZN dropped to $198.20 (target $198.50)"
        );
        assert!(repository.all()[0].triggered);

        // nothing left for this user
        assert_eq!(monitor.run_user_cycle("u1").await.unwrap(), CycleSummary::default());
        assert_eq!(monitor.run_user_cycle("u2").await.unwrap(), CycleSummary::default());
    }

    #[tokio::test]
    async fn test_alert_already_triggered_elsewhere_is_not_notified() {
        let repository = Arc::new(InMemoryAlertRepository::with_alerts(vec![percent(
            "a1",
            "NVDA",
            dec!(1),
            dec!(131.6),
        )]));
        let alerts = repository.list_untriggered().unwrap();
        repository.mark_triggered("a1", Utc::now()).await.unwrap();

        let notifier = MockNotifier::new();
        let monitor = monitor(repository.clone(), notifier.clone());

        // a stale snapshot still contains the alert as untriggered
        let summary = monitor.process(alerts, NotifyPolicy::OnTransition).await;
        assert_eq!(summary.checked_count, 1);
        assert_eq!(summary.triggered_count, 0);
        assert!(notifier.is_empty());
    }
}
