//! Alert domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pricewatch_market_data::canonical_symbol;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Smallest accepted `baseline` or `targetPrice`.
pub const MIN_ALERT_PRICE: Decimal = dec!(0.0001);

/// Largest accepted `baseline` or `targetPrice`.
pub const MAX_ALERT_PRICE: Decimal = dec!(1_000_000_000);

/// Largest accepted `percent`.
pub const MAX_ALERT_PERCENT: Decimal = dec!(10_000);

fn check_price(field: &str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(Error::invalid_input(format!("{} must be greater than 0", field)));
    }
    if value < MIN_ALERT_PRICE || value > MAX_ALERT_PRICE {
        return Err(Error::invalid_input(format!(
            "{} must be between {} and {}",
            field, MIN_ALERT_PRICE, MAX_ALERT_PRICE
        )));
    }
    Ok(())
}

/// Which way the price has to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Rise,
    Drop,
}

impl AlertDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rise => "rise",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rise" => Ok(Self::Rise),
            "drop" => Ok(Self::Drop),
            other => Err(Error::invalid_input(format!(
                "direction must be 'rise' or 'drop', got '{}'",
                other
            ))),
        }
    }
}

/// Discriminant of [`AlertCondition`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    #[default]
    Percent,
    Absolute,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Absolute => "absolute",
        }
    }
}

impl FromStr for AlertKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(Self::Percent),
            "absolute" => Ok(Self::Absolute),
            other => Err(Error::invalid_input(format!(
                "kind must be 'percent' or 'absolute', got '{}'",
                other
            ))),
        }
    }
}

/// Threshold of an alert. Exactly one payload shape per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlertCondition {
    /// Move of `percent` relative to `baseline`
    Percent { percent: Decimal, baseline: Decimal },
    /// Price crossing `target_price`
    Absolute {
        #[serde(rename = "targetPrice")]
        target_price: Decimal,
    },
}

impl AlertCondition {
    pub fn kind(&self) -> AlertKind {
        match self {
            Self::Percent { .. } => AlertKind::Percent,
            Self::Absolute { .. } => AlertKind::Absolute,
        }
    }
}

/// Domain model representing a price alert.
///
/// Once `triggered` is set the record is never modified again, only deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub direction: AlertDirection,
    #[serde(flatten)]
    pub condition: AlertCondition,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn kind(&self) -> AlertKind {
        self.condition.kind()
    }
}

/// Input model for creating a new alert, as submitted by a client.
///
/// Fields are loosely typed here and checked by [`NewAlert::validate`].
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    #[serde(default)]
    pub symbol: String,
    /// "rise" or "drop"
    #[serde(default, alias = "type")]
    pub direction: String,
    /// "percent" (default) or "absolute"
    pub kind: Option<String>,
    pub percent: Option<Decimal>,
    pub baseline: Option<Decimal>,
    pub target_price: Option<Decimal>,
}

/// The validated parts of a [`NewAlert`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSpec {
    pub symbol: String,
    pub direction: AlertDirection,
    pub condition: AlertCondition,
}

impl NewAlert {
    /// Check the payload and turn it into a typed [`AlertSpec`].
    ///
    /// Rejects payloads carrying fields of the other kind.
    pub fn validate(&self) -> Result<AlertSpec> {
        let symbol = canonical_symbol(&self.symbol);
        if symbol.is_empty() {
            return Err(Error::missing_field("symbol"));
        }

        if self.direction.trim().is_empty() {
            return Err(Error::missing_field("direction"));
        }
        let direction: AlertDirection = self.direction.parse()?;

        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => AlertKind::default(),
            Some(kind) => kind.parse()?,
        };

        let condition = match kind {
            AlertKind::Absolute => {
                if self.percent.is_some() || self.baseline.is_some() {
                    return Err(Error::invalid_input(
                        "absolute alerts take targetPrice only",
                    ));
                }
                let target_price = self
                    .target_price
                    .ok_or_else(|| Error::missing_field("targetPrice"))?;
                check_price("targetPrice", target_price)?;
                AlertCondition::Absolute { target_price }
            }
            AlertKind::Percent => {
                if self.target_price.is_some() {
                    return Err(Error::invalid_input(
                        "percent alerts take percent and baseline only",
                    ));
                }
                let percent = self.percent.ok_or_else(|| Error::missing_field("percent"))?;
                let baseline = self
                    .baseline
                    .ok_or_else(|| Error::missing_field("baseline"))?;
                if percent <= Decimal::ZERO {
                    return Err(Error::invalid_input("percent must be greater than 0"));
                }
                if percent > MAX_ALERT_PERCENT {
                    return Err(Error::invalid_input(format!(
                        "percent must be at most {}",
                        MAX_ALERT_PERCENT
                    )));
                }
                check_price("baseline", baseline)?;
                AlertCondition::Percent { percent, baseline }
            }
        };

        Ok(AlertSpec {
            symbol,
            direction,
            condition,
        })
    }
}
