//! Notifier trait and implementations.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// A message telling a user that one of their alerts fired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: String,
    pub alert_id: String,
    /// e.g. "AAPL Alert"
    pub title: String,
    pub body: String,
    /// Receivers replace an earlier notification carrying the same tag
    pub tag: String,
}

/// Trait for delivering alert notifications.
///
/// The alert engine only decides that and what to notify; implementations
/// decide how (push, OS notification, event stream, log line).
///
/// # Design Rules
///
/// - `deliver()` must be fast and non-blocking (no network calls, no DB writes)
/// - Implementations should queue notifications for async processing
/// - Failure to deliver must not affect evaluation (best-effort)
pub trait Notifier: Send + Sync {
    /// Deliver a single notification.
    fn deliver(&self, notification: Notification);

    /// Deliver several notifications.
    ///
    /// Default implementation calls `deliver()` for each one.
    fn deliver_batch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            self.deliver(notification);
        }
    }
}

/// Writes notifications to the log and nothing else.
#[derive(Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, notification: Notification) {
        log::info!(
            "[{}] {}: {} ({})",
            notification.user_id,
            notification.title,
            notification.body,
            notification.tag
        );
    }
}

/// Fans a notification out to several notifiers.
#[derive(Clone, Default)]
pub struct CompositeNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

impl Notifier for CompositeNotifier {
    fn deliver(&self, notification: Notification) {
        for notifier in &self.notifiers {
            notifier.deliver(notification.clone());
        }
    }
}

/// Mock notifier for testing - collects delivered notifications.
#[derive(Clone, Default)]
pub struct MockNotifier {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected notifications.
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }

    /// Clears collected notifications.
    pub fn clear(&self) {
        self.delivered.lock().unwrap().clear();
    }

    /// Returns the number of collected notifications.
    pub fn len(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    /// Returns true if nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.delivered.lock().unwrap().is_empty()
    }
}

impl Notifier for MockNotifier {
    fn deliver(&self, notification: Notification) {
        self.delivered.lock().unwrap().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(tag: &str) -> Notification {
        Notification {
            user_id: "u1".to_string(),
            alert_id: "a1".to_string(),
            title: "AAPL Alert".to_string(),
            body: "AAPL reached $200.00 (target $200.00)".to_string(),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn test_log_notifier_does_not_panic() {
        let notifier = LogNotifier;
        notifier.deliver(notification("alert-a1"));
        notifier.deliver_batch(vec![notification("alert-a2"), notification("alert-a3")]);
    }

    #[test]
    fn test_mock_notifier_collects() {
        let notifier = MockNotifier::new();
        assert!(notifier.is_empty());

        notifier.deliver(notification("alert-a1"));
        assert_eq!(notifier.len(), 1);

        notifier.deliver_batch(vec![notification("alert-a2"), notification("alert-a3")]);
        assert_eq!(notifier.len(), 3);
        assert_eq!(notifier.delivered()[2].tag, "alert-a3");

        notifier.clear();
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_composite_fans_out() {
        let first = MockNotifier::new();
        let second = MockNotifier::new();
        let composite = CompositeNotifier::new(vec![
            Arc::new(first.clone()),
            Arc::new(second.clone()),
        ]);

        composite.deliver(notification("alert-a1"));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
