use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use uuid::Uuid;

use super::alerts_model::{Alert, NewAlert};
use super::alerts_traits::{AlertRepositoryTrait, AlertServiceTrait};
use crate::errors::{Error, Result};

/// Alert CRUD on behalf of one calling user.
pub struct AlertService {
    repository: Arc<dyn AlertRepositoryTrait>,
}

impl AlertService {
    pub fn new(repository: Arc<dyn AlertRepositoryTrait>) -> Self {
        Self { repository }
    }

    fn owned_alert(&self, user_id: &str, alert_id: &str) -> Result<Alert> {
        match self.repository.get_alert(alert_id)? {
            Some(alert) if alert.user_id == user_id => Ok(alert),
            _ => Err(Error::not_found(format!("alert {}", alert_id))),
        }
    }
}

#[async_trait]
impl AlertServiceTrait for AlertService {
    fn get_alerts(&self, user_id: &str) -> Result<Vec<Alert>> {
        self.repository.list_for_user(user_id)
    }

    async fn create_alert(&self, user_id: &str, new_alert: NewAlert) -> Result<Alert> {
        let spec = new_alert.validate()?;
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            symbol: spec.symbol,
            direction: spec.direction,
            condition: spec.condition,
            triggered: false,
            triggered_at: None,
            created_at: Utc::now(),
        };
        let created = self.repository.create(alert).await?;
        info!(
            "Created {} {} alert {} on {}",
            created.kind().as_str(),
            created.direction,
            created.id,
            created.symbol
        );
        Ok(created)
    }

    async fn mark_triggered(&self, user_id: &str, alert_id: &str) -> Result<bool> {
        self.owned_alert(user_id, alert_id)?;
        let transitioned = self.repository.mark_triggered(alert_id, Utc::now()).await?;
        if !transitioned {
            debug!("Alert {} was already triggered", alert_id);
        }
        Ok(transitioned)
    }

    async fn delete_alert(&self, user_id: &str, alert_id: &str) -> Result<()> {
        let removed = self.repository.delete(alert_id, user_id).await?;
        if removed == 0 {
            return Err(Error::not_found(format!("alert {}", alert_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::test_support::InMemoryAlertRepository;
    use crate::errors::DatabaseError;
    use rust_decimal_macros::dec;

    fn new_alert() -> NewAlert {
        NewAlert {
            symbol: "aapl".to_string(),
            direction: "rise".to_string(),
            kind: Some("percent".to_string()),
            percent: Some(dec!(5)),
            baseline: Some(dec!(100)),
            target_price: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let repository = Arc::new(InMemoryAlertRepository::default());
        let service = AlertService::new(repository.clone());

        let created = service.create_alert("u1", new_alert()).await.unwrap();
        assert_eq!(created.symbol, "AAPL");
        assert!(!created.triggered);

        assert_eq!(service.get_alerts("u1").unwrap().len(), 1);
        assert!(service.get_alerts("u2").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_alert_is_not_stored() {
        let repository = Arc::new(InMemoryAlertRepository::default());
        let service = AlertService::new(repository.clone());

        let mut input = new_alert();
        input.baseline = None;
        assert!(matches!(
            service.create_alert("u1", input).await,
            Err(Error::Validation(_))
        ));
        assert!(repository.list_untriggered().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_triggered_is_idempotent() {
        let service = AlertService::new(Arc::new(InMemoryAlertRepository::default()));
        let created = service.create_alert("u1", new_alert()).await.unwrap();

        assert!(service.mark_triggered("u1", &created.id).await.unwrap());
        assert!(!service.mark_triggered("u1", &created.id).await.unwrap());

        let stored = &service.get_alerts("u1").unwrap()[0];
        assert!(stored.triggered);
        assert!(stored.triggered_at.is_some());
    }

    #[tokio::test]
    async fn test_other_users_alerts_are_hidden() {
        let service = AlertService::new(Arc::new(InMemoryAlertRepository::default()));
        let created = service.create_alert("u1", new_alert()).await.unwrap();

        assert!(matches!(
            service.mark_triggered("u2", &created.id).await,
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
        assert!(service.delete_alert("u2", &created.id).await.is_err());

        service.delete_alert("u1", &created.id).await.unwrap();
        assert!(service.get_alerts("u1").unwrap().is_empty());
    }
}
