use rust_decimal::{Decimal, RoundingStrategy};

/// Provider identifier (e.g., "FINNHUB", "DEMO").
pub type ProviderId = &'static str;

/// Canonical cache/lookup form of a ticker: trimmed and uppercased.
pub fn canonical_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Round to cents, halves toward positive infinity (-2.105 becomes -2.10).
pub fn round_cents(value: Decimal) -> Decimal {
    let strategy = if value.is_sign_negative() {
        RoundingStrategy::MidpointTowardZero
    } else {
        RoundingStrategy::MidpointAwayFromZero
    };
    value.round_dp_with_strategy(2, strategy)
}
