//! In-memory alert repository shared by the alert tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::alerts_model::Alert;
use super::alerts_traits::AlertRepositoryTrait;
use crate::errors::Result;

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: Mutex<Vec<Alert>>,
}

impl InMemoryAlertRepository {
    pub fn with_alerts(alerts: Vec<Alert>) -> Self {
        Self {
            alerts: Mutex::new(alerts),
        }
    }

    pub fn all(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertRepositoryTrait for InMemoryAlertRepository {
    fn list_for_user(&self, user_id: &str) -> Result<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self
            .all()
            .into_iter()
            .filter(|alert| alert.user_id == user_id)
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    fn list_active(&self, user_id: &str) -> Result<Vec<Alert>> {
        Ok(self
            .list_for_user(user_id)?
            .into_iter()
            .filter(|alert| !alert.triggered)
            .collect())
    }

    fn list_untriggered(&self) -> Result<Vec<Alert>> {
        Ok(self.all().into_iter().filter(|alert| !alert.triggered).collect())
    }

    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        Ok(self.all().into_iter().find(|alert| alert.id == alert_id))
    }

    async fn create(&self, alert: Alert) -> Result<Alert> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(alert)
    }

    async fn mark_triggered(&self, alert_id: &str, triggered_at: DateTime<Utc>) -> Result<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        match alerts
            .iter_mut()
            .find(|alert| alert.id == alert_id && !alert.triggered)
        {
            Some(alert) => {
                alert.triggered = true;
                alert.triggered_at = Some(triggered_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, alert_id: &str, user_id: &str) -> Result<usize> {
        let mut alerts = self.alerts.lock().unwrap();
        let before = alerts.len();
        alerts.retain(|alert| !(alert.id == alert_id && alert.user_id == user_id));
        Ok(before - alerts.len())
    }
}
