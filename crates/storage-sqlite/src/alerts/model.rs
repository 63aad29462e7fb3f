//! Database models for alerts.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use pricewatch_core::alerts::{Alert, AlertCondition, AlertDirection, AlertKind};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;

/// Database model for alerts.
///
/// Decimals and timestamps are stored as text. Timestamps use a fixed-width
/// RFC 3339 form so that text ordering matches time ordering.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::alerts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AlertDB {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub direction: String,
    pub kind: String,
    pub percent: Option<String>,
    pub baseline: Option<String>,
    pub target_price: Option<String>,
    pub triggered: bool,
    pub triggered_at: Option<String>,
    pub created_at: String,
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("{}: {}", column, e)))
}

fn parse_decimal(column: &str, value: Option<&str>) -> Result<Decimal, StorageError> {
    let value = value.ok_or_else(|| StorageError::Corrupt(format!("{} is missing", column)))?;
    Decimal::from_str(value).map_err(|e| StorageError::Corrupt(format!("{}: {}", column, e)))
}

impl From<Alert> for AlertDB {
    fn from(alert: Alert) -> Self {
        let (percent, baseline, target_price) = match alert.condition {
            AlertCondition::Percent { percent, baseline } => {
                (Some(percent.to_string()), Some(baseline.to_string()), None)
            }
            AlertCondition::Absolute { target_price } => {
                (None, None, Some(target_price.to_string()))
            }
        };

        Self {
            kind: alert.condition.kind().as_str().to_string(),
            id: alert.id,
            user_id: alert.user_id,
            symbol: alert.symbol,
            direction: alert.direction.as_str().to_string(),
            percent,
            baseline,
            target_price,
            triggered: alert.triggered,
            triggered_at: alert.triggered_at.map(format_timestamp),
            created_at: format_timestamp(alert.created_at),
        }
    }
}

impl TryFrom<AlertDB> for Alert {
    type Error = StorageError;

    fn try_from(db: AlertDB) -> Result<Self, Self::Error> {
        let direction = AlertDirection::from_str(&db.direction)?;
        let condition = match AlertKind::from_str(&db.kind)? {
            AlertKind::Percent => AlertCondition::Percent {
                percent: parse_decimal("percent", db.percent.as_deref())?,
                baseline: parse_decimal("baseline", db.baseline.as_deref())?,
            },
            AlertKind::Absolute => AlertCondition::Absolute {
                target_price: parse_decimal("target_price", db.target_price.as_deref())?,
            },
        };

        Ok(Alert {
            id: db.id,
            user_id: db.user_id,
            symbol: db.symbol,
            direction,
            condition,
            triggered: db.triggered,
            triggered_at: db
                .triggered_at
                .as_deref()
                .map(|ts| parse_timestamp("triggered_at", ts))
                .transpose()?,
            created_at: parse_timestamp("created_at", &db.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn alert(condition: AlertCondition) -> Alert {
        Alert {
            id: "a1".to_string(),
            user_id: "local".to_string(),
            symbol: "AAPL".to_string(),
            direction: AlertDirection::Drop,
            condition,
            triggered: false,
            triggered_at: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, 4, 15, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_absolute_alert_columns() {
        let db = AlertDB::from(alert(AlertCondition::Absolute {
            target_price: dec!(199.99),
        }));
        assert_eq!(db.kind, "absolute");
        assert_eq!(db.direction, "drop");
        assert_eq!(db.target_price.as_deref(), Some("199.99"));
        assert!(db.percent.is_none() && db.baseline.is_none());
        assert_eq!(db.created_at, "2025-03-04T15:30:00.000000Z");
    }

    #[test]
    fn test_percent_alert_restores_from_columns() {
        let original = alert(AlertCondition::Percent {
            percent: dec!(5),
            baseline: dec!(226.40),
        });
        let restored = Alert::try_from(AlertDB::from(original.clone())).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_missing_payload_column_is_corrupt() {
        let mut db = AlertDB::from(alert(AlertCondition::Percent {
            percent: dec!(5),
            baseline: dec!(100),
        }));
        db.baseline = None;
        assert!(matches!(
            Alert::try_from(db),
            Err(StorageError::Corrupt(message)) if message.contains("baseline")
        ));
    }
}
