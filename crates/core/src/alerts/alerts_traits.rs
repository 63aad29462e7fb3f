use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alerts::alerts_model::{Alert, NewAlert};
use crate::alerts::monitor::CycleSummary;
use crate::errors::Result;

/// Trait for alert repository operations
#[async_trait]
pub trait AlertRepositoryTrait: Send + Sync {
    /// All alerts owned by `user_id`, newest first.
    fn list_for_user(&self, user_id: &str) -> Result<Vec<Alert>>;

    /// Untriggered alerts owned by `user_id`.
    fn list_active(&self, user_id: &str) -> Result<Vec<Alert>>;

    /// Untriggered alerts of every user.
    fn list_untriggered(&self) -> Result<Vec<Alert>>;

    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>>;

    async fn create(&self, alert: Alert) -> Result<Alert>;

    /// Set `triggered` if it is not set yet.
    ///
    /// Returns whether this call performed the transition; a second call for
    /// the same alert returns `false` and changes nothing.
    async fn mark_triggered(&self, alert_id: &str, triggered_at: DateTime<Utc>) -> Result<bool>;

    /// Delete an alert owned by `user_id`; returns the number of rows removed.
    async fn delete(&self, alert_id: &str, user_id: &str) -> Result<usize>;
}

/// Trait for alert service operations
#[async_trait]
pub trait AlertServiceTrait: Send + Sync {
    fn get_alerts(&self, user_id: &str) -> Result<Vec<Alert>>;
    async fn create_alert(&self, user_id: &str, new_alert: NewAlert) -> Result<Alert>;
    async fn mark_triggered(&self, user_id: &str, alert_id: &str) -> Result<bool>;
    async fn delete_alert(&self, user_id: &str, alert_id: &str) -> Result<()>;
}

/// Trait for running evaluation cycles
#[async_trait]
pub trait AlertMonitorTrait: Send + Sync {
    /// Evaluate every untriggered alert on `symbols`.
    async fn run_evaluation_cycle(&self, symbols: &[String]) -> Result<CycleSummary>;

    /// Evaluate every untriggered alert of every user.
    async fn run_full_cycle(&self) -> Result<CycleSummary>;
}
