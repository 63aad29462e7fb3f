use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{canonical_symbol, round_cents};
use crate::errors::MarketDataError;

/// Latest price snapshot for one symbol.
///
/// `change` and `change_percent` are always derived from `price` and
/// `previous_close` on our side; provider-supplied deltas are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Canonical (uppercase) symbol
    pub symbol: String,

    /// Current price (`c`)
    pub price: Decimal,

    /// Previous session close (`pc`)
    pub previous_close: Decimal,

    /// Day open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Day high
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Day low
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// `price - previous_close`, rounded to 2 decimals
    pub change: Decimal,

    /// `change / previous_close * 100`, rounded to 2 decimals
    pub change_percent: Decimal,

    /// Provider timestamp of the quote
    pub timestamp: DateTime<Utc>,

    /// Source of the quote (FINNHUB, DEMO)
    pub source: String,
}

impl Quote {
    /// Create a validated quote. Rejects non-positive `price` or `previous_close`
    /// and prices whose derived change does not fit in a [`Decimal`].
    pub fn new(
        symbol: &str,
        price: Decimal,
        previous_close: Decimal,
        timestamp: DateTime<Utc>,
        source: &str,
    ) -> Result<Self, MarketDataError> {
        let symbol = canonical_symbol(symbol);
        if price <= Decimal::ZERO || previous_close <= Decimal::ZERO {
            return Err(MarketDataError::ValidationFailed {
                message: format!(
                    "Invalid quote for {}: price={} previous_close={}",
                    symbol, price, previous_close
                ),
            });
        }

        let (change, change_percent) =
            compute_change(price, previous_close).map_err(|e| match e {
                MarketDataError::ValidationFailed { message } => {
                    MarketDataError::ValidationFailed {
                        message: format!("Invalid quote for {}: {}", symbol, message),
                    }
                }
                other => other,
            })?;
        Ok(Self {
            symbol,
            price,
            previous_close,
            open: None,
            high: None,
            low: None,
            change,
            change_percent,
            timestamp,
            source: source.to_string(),
        })
    }

    /// Attach the day's open/high/low.
    pub fn with_day_range(
        mut self,
        open: Option<Decimal>,
        high: Option<Decimal>,
        low: Option<Decimal>,
    ) -> Self {
        self.open = open;
        self.high = high;
        self.low = low;
        self
    }

    /// A quote may be cached or fed to alert evaluation only when both
    /// prices are strictly positive.
    pub fn is_valid(&self) -> bool {
        self.price > Decimal::ZERO && self.previous_close > Decimal::ZERO
    }
}

/// Derive `(change, change_percent)` from a price and its previous close.
///
/// Both values are rounded to 2 decimals; both are zero when
/// `previous_close` is zero or negative. Fails with
/// [`MarketDataError::ValidationFailed`] when either value overflows.
pub fn compute_change(
    price: Decimal,
    previous_close: Decimal,
) -> Result<(Decimal, Decimal), MarketDataError> {
    if previous_close <= Decimal::ZERO {
        return Ok((Decimal::ZERO, Decimal::ZERO));
    }
    let overflow = || MarketDataError::ValidationFailed {
        message: format!(
            "change from {} to {} is out of range",
            previous_close, price
        ),
    };
    let change = price.checked_sub(previous_close).ok_or_else(overflow)?;
    let change_percent = change
        .checked_div(previous_close)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(overflow)?;
    Ok((round_cents(change), round_cents(change_percent)))
}
