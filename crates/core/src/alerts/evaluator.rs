//! Alert threshold evaluation.
//!
//! Pure functions: nothing here touches storage or delivers notifications.

use std::collections::HashMap;

use log::warn;
use pricewatch_market_data::{canonical_symbol, round_cents, Quote};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::alerts_model::{Alert, AlertCondition, AlertDirection};
use crate::notifications::Notification;

/// Current price of one symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct PricePoint {
    pub symbol: String,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(symbol: &str, price: Decimal) -> Self {
        Self {
            symbol: canonical_symbol(symbol),
            price,
        }
    }
}

impl From<&Quote> for PricePoint {
    fn from(quote: &Quote) -> Self {
        Self::new(&quote.symbol, quote.price)
    }
}

/// An alert whose condition held at `price`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTrigger {
    pub alert_id: String,
    pub user_id: String,
    pub symbol: String,
    pub price: Decimal,
    pub title: String,
    pub message: String,
    /// Stable per alert so repeated deliveries collapse on the receiving side
    pub dedupe_tag: String,
}

impl AlertTrigger {
    pub fn notification(&self) -> Notification {
        Notification {
            user_id: self.user_id.clone(),
            alert_id: self.alert_id.clone(),
            title: self.title.clone(),
            body: self.message.clone(),
            tag: self.dedupe_tag.clone(),
        }
    }
}

/// Percent move from `baseline` to `price`.
///
/// `None` for a non-positive baseline or when the result does not fit in a
/// [`Decimal`].
pub fn percent_change(price: Decimal, baseline: Decimal) -> Option<Decimal> {
    if baseline <= Decimal::ZERO {
        return None;
    }
    price
        .checked_sub(baseline)?
        .checked_div(baseline)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Whether `alert`'s threshold is satisfied at `price`.
pub fn condition_met(alert: &Alert, price: Decimal) -> bool {
    match (&alert.condition, alert.direction) {
        (AlertCondition::Absolute { target_price }, AlertDirection::Rise) => price >= *target_price,
        (AlertCondition::Absolute { target_price }, AlertDirection::Drop) => price <= *target_price,
        (AlertCondition::Percent { percent, baseline }, direction) => {
            let Some(delta) = percent_change(price, *baseline) else {
                warn!(
                    "Alert {} skipped: cannot compute change from {} to {}",
                    alert.id, baseline, price
                );
                return false;
            };
            match direction {
                AlertDirection::Rise => delta >= *percent,
                AlertDirection::Drop => delta <= -*percent,
            }
        }
    }
}

pub fn trigger_title(alert: &Alert) -> String {
    format!("{} Alert", alert.symbol)
}

pub fn dedupe_tag(alert: &Alert) -> String {
    format!("alert-{}", alert.id)
}

/// Human-readable description of the crossing.
pub fn trigger_message(alert: &Alert, price: Decimal) -> String {
    let price = round_cents(price);
    match &alert.condition {
        AlertCondition::Absolute { target_price } => {
            let verb = match alert.direction {
                AlertDirection::Rise => "reached",
                AlertDirection::Drop => "dropped to",
            };
            format!(
                "{} {} ${:.2} (target ${:.2})",
                alert.symbol,
                verb,
                price,
                round_cents(*target_price)
            )
        }
        AlertCondition::Percent { baseline, .. } => {
            let delta = percent_change(price, *baseline).unwrap_or_default();
            let word = if delta >= Decimal::ZERO { "up" } else { "down" };
            let delta = delta
                .abs()
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            format!(
                "{} is {} {:.1}% from ${:.2} to ${:.2}",
                alert.symbol,
                word,
                delta,
                round_cents(*baseline),
                price
            )
        }
    }
}

/// Decide which alerts fire at the given prices.
///
/// Prices are keyed by symbol with the last duplicate winning. Triggered
/// alerts and alerts without a price are skipped.
pub fn evaluate(prices: &[PricePoint], alerts: &[Alert]) -> Vec<AlertTrigger> {
    let by_symbol: HashMap<&str, Decimal> = prices
        .iter()
        .map(|point| (point.symbol.as_str(), point.price))
        .collect();

    alerts
        .iter()
        .filter(|alert| !alert.triggered)
        .filter_map(|alert| {
            let price = *by_symbol.get(alert.symbol.as_str())?;
            condition_met(alert, price).then(|| AlertTrigger {
                alert_id: alert.id.clone(),
                user_id: alert.user_id.clone(),
                symbol: alert.symbol.clone(),
                price,
                title: trigger_title(alert),
                message: trigger_message(alert, price),
                dedupe_tag: dedupe_tag(alert),
            })
        })
        .collect()
}
