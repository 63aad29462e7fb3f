use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use pricewatch_core::alerts::{Alert, AlertRepositoryTrait};
use pricewatch_core::Result;

use super::model::{format_timestamp, AlertDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::alerts;

pub struct AlertRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

fn into_alerts(rows: Vec<AlertDB>) -> Result<Vec<Alert>> {
    rows.into_iter()
        .map(|row| Alert::try_from(row).map_err(Into::into))
        .collect()
}

impl AlertRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        AlertRepository { pool, writer }
    }
}

#[async_trait]
impl AlertRepositoryTrait for AlertRepository {
    fn list_for_user(&self, user_id: &str) -> Result<Vec<Alert>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = alerts::table
            .filter(alerts::user_id.eq(user_id))
            .order((alerts::created_at.desc(), alerts::id.desc()))
            .select(AlertDB::as_select())
            .load::<AlertDB>(&mut conn)
            .map_err(StorageError::from)?;
        into_alerts(rows)
    }

    fn list_active(&self, user_id: &str) -> Result<Vec<Alert>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = alerts::table
            .filter(alerts::user_id.eq(user_id))
            .filter(alerts::triggered.eq(false))
            .order((alerts::created_at.desc(), alerts::id.desc()))
            .select(AlertDB::as_select())
            .load::<AlertDB>(&mut conn)
            .map_err(StorageError::from)?;
        into_alerts(rows)
    }

    fn list_untriggered(&self) -> Result<Vec<Alert>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = alerts::table
            .filter(alerts::triggered.eq(false))
            .order(alerts::created_at.asc())
            .select(AlertDB::as_select())
            .load::<AlertDB>(&mut conn)
            .map_err(StorageError::from)?;
        into_alerts(rows)
    }

    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        let mut conn = get_connection(&self.pool)?;
        let row = alerts::table
            .find(alert_id)
            .select(AlertDB::as_select())
            .first::<AlertDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(|row| Alert::try_from(row).map_err(Into::into))
            .transpose()
    }

    async fn create(&self, alert: Alert) -> Result<Alert> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Alert> {
                let alert_db = AlertDB::from(alert);
                let inserted = diesel::insert_into(alerts::table)
                    .values(&alert_db)
                    .returning(AlertDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Alert::try_from(inserted)?)
            })
            .await
    }

    async fn mark_triggered(&self, alert_id: &str, triggered_at: DateTime<Utc>) -> Result<bool> {
        let alert_id = alert_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                // Only an untriggered row matches, so concurrent callers race on
                // the row rather than on a read-then-write.
                let changed = diesel::update(
                    alerts::table
                        .filter(alerts::id.eq(alert_id.as_str()))
                        .filter(alerts::triggered.eq(false)),
                )
                .set((
                    alerts::triggered.eq(true),
                    alerts::triggered_at.eq(Some(format_timestamp(triggered_at))),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                if changed == 0 {
                    debug!("Alert {} was already triggered or does not exist", alert_id);
                }
                Ok(changed == 1)
            })
            .await
    }

    async fn delete(&self, alert_id: &str, user_id: &str) -> Result<usize> {
        let alert_id = alert_id.to_string();
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let deleted = diesel::delete(
                    alerts::table
                        .filter(alerts::id.eq(alert_id.as_str()))
                        .filter(alerts::user_id.eq(user_id.as_str())),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(deleted)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, init, run_migrations, spawn_writer};
    use chrono::{Duration, TimeZone};
    use pricewatch_core::alerts::{AlertCondition, AlertDirection};
    use pricewatch_core::errors::DatabaseError;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    struct TestDb {
        _dir: TempDir,
        repository: AlertRepository,
    }

    fn setup() -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.db");
        let db_path = init(path.to_str().unwrap()).unwrap();
        let pool = create_pool(&db_path).unwrap();
        run_migrations(&pool).unwrap();
        let writer = spawn_writer((*pool).clone());
        TestDb {
            _dir: dir,
            repository: AlertRepository::new(pool, writer),
        }
    }

    fn alert(id: &str, user_id: &str, symbol: &str, minutes: i64) -> Alert {
        Alert {
            id: id.to_string(),
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            direction: AlertDirection::Rise,
            condition: AlertCondition::Absolute {
                target_price: dec!(200),
            },
            triggered: false,
            triggered_at: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_newest_first() {
        let db = setup();
        db.repository.create(alert("a", "u1", "AAPL", 0)).await.unwrap();
        db.repository.create(alert("b", "u1", "TSLA", 5)).await.unwrap();
        db.repository.create(alert("c", "u2", "AAPL", 10)).await.unwrap();

        let ids: Vec<String> = db
            .repository
            .list_for_user("u1")
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(db.repository.list_untriggered().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_percent_alert_survives_storage() {
        let db = setup();
        let mut percent = alert("p", "u1", "AAPL", 0);
        percent.condition = AlertCondition::Percent {
            percent: dec!(2.5),
            baseline: dec!(226.40),
        };
        db.repository.create(percent.clone()).await.unwrap();

        let stored = db.repository.get_alert("p").unwrap().unwrap();
        assert_eq!(stored, percent);
        assert!(db.repository.get_alert("missing").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_triggered_only_transitions_once() {
        let db = setup();
        db.repository.create(alert("a", "u1", "AAPL", 0)).await.unwrap();
        let at = Utc.with_ymd_and_hms(2025, 1, 10, 15, 0, 0).unwrap();

        assert!(db.repository.mark_triggered("a", at).await.unwrap());
        assert!(!db
            .repository
            .mark_triggered("a", at + Duration::minutes(1))
            .await
            .unwrap());
        assert!(!db.repository.mark_triggered("missing", at).await.unwrap());

        let stored = db.repository.get_alert("a").unwrap().unwrap();
        assert!(stored.triggered);
        assert_eq!(stored.triggered_at, Some(at));
        assert!(db.repository.list_active("u1").unwrap().is_empty());
        assert!(db.repository.list_untriggered().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_mark_triggered_has_one_winner() {
        let db = setup();
        db.repository.create(alert("a", "u1", "AAPL", 0)).await.unwrap();
        let at = Utc::now();

        let (a, b, c) = tokio::join!(
            db.repository.mark_triggered("a", at),
            db.repository.mark_triggered("a", at),
            db.repository.mark_triggered("a", at),
        );
        let winners = [a.unwrap(), b.unwrap(), c.unwrap()];
        assert_eq!(winners.iter().filter(|won| **won).count(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_owner() {
        let db = setup();
        db.repository.create(alert("a", "u1", "AAPL", 0)).await.unwrap();

        assert_eq!(db.repository.delete("a", "u2").await.unwrap(), 0);
        assert!(db.repository.get_alert("a").unwrap().is_some());
        assert_eq!(db.repository.delete("a", "u1").await.unwrap(), 1);
        assert!(db.repository.get_alert("a").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let db = setup();
        db.repository.create(alert("a", "u1", "AAPL", 0)).await.unwrap();
        let err = db
            .repository
            .create(alert("a", "u1", "AAPL", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            pricewatch_core::Error::Database(DatabaseError::UniqueViolation(_))
        ));
    }
}
