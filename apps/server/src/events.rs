use pricewatch_core::notifications::{Notification, Notifier};
use serde_json::Value;
use tokio::sync::broadcast;

/// Event names carried on the server-sent event stream.
pub const ALERT_TRIGGERED: &str = "alert:triggered";
pub const ALERT_CHECK_COMPLETE: &str = "alert:check-complete";

/// Serializable envelope that carries event names and optional payloads.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    pub name: &'static str,
    pub payload: Option<Value>,
}

impl ServerEvent {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            payload: None,
        }
    }

    pub fn with_payload(name: &'static str, payload: Value) -> Self {
        Self {
            name,
            payload: Some(payload),
        }
    }
}

/// Lightweight broadcast bus that fans out events to any connected clients.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ServerEvent) {
        // No subscribers is fine; lagging ones drop events.
        let _ = self.sender.send(event);
    }
}

/// Forwards alert notifications to event stream subscribers.
#[derive(Clone)]
pub struct EventBusNotifier {
    bus: EventBus,
}

impl EventBusNotifier {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl Notifier for EventBusNotifier {
    fn deliver(&self, notification: Notification) {
        match serde_json::to_value(&notification) {
            Ok(payload) => self
                .bus
                .publish(ServerEvent::with_payload(ALERT_TRIGGERED, payload)),
            Err(err) => tracing::error!(
                "Failed to serialize notification for alert {}: {}",
                notification.alert_id,
                err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notifier_publishes_alert_event() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();
        EventBusNotifier::new(bus.clone()).deliver(Notification {
            user_id: "local".to_string(),
            alert_id: "a1".to_string(),
            title: "AAPL Alert".to_string(),
            body: "AAPL reached $228.50 (target $200.00)".to_string(),
            tag: "alert-a1".to_string(),
        });

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, ALERT_TRIGGERED);
        assert_eq!(event.payload.unwrap()["tag"], "alert-a1");
    }

    #[test]
    fn test_publish_without_subscribers_is_ignored() {
        EventBus::new(1).publish(ServerEvent::new(ALERT_CHECK_COMPLETE));
    }
}
