//! Quote view models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pricewatch_market_data::{round_cents, CompanyProfile, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Chart look-back window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartPeriod {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl ChartPeriod {
    pub fn days(&self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
        }
    }
}

impl fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            "1y" => Ok(Self::Year),
            other => Err(Error::invalid_input(format!("Unknown chart period: {}", other))),
        }
    }
}

/// Quote and profile of one stock, as shown on a dashboard row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub open: Option<Decimal>,
    pub previous_close: Decimal,
    pub updated_at: DateTime<Utc>,
    pub sector: Option<String>,
}

impl StockSnapshot {
    /// Combine a quote with an optional profile; the name falls back to the
    /// symbol.
    pub fn from_parts(quote: &Quote, profile: Option<&CompanyProfile>) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            name: profile
                .map(|p| p.name.clone())
                .unwrap_or_else(|| quote.symbol.clone()),
            price: round_cents(quote.price),
            change: quote.change,
            change_percent: quote.change_percent,
            high: quote.high,
            low: quote.low,
            open: quote.open,
            previous_close: quote.previous_close,
            updated_at: quote.timestamp,
            sector: profile.and_then(|p| p.industry.clone()),
        }
    }
}

/// Snapshots for a symbol list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBatch {
    pub stocks: Vec<StockSnapshot>,
    /// Symbols without a valid quote
    pub missing: Vec<String>,
}

/// Closing prices with display labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    /// "Mon D", e.g. "Jan 5"
    pub labels: Vec<String>,
    pub values: Vec<Decimal>,
}
