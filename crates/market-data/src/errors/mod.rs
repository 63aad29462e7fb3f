//! Error types for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for provider and adapter operations
//! - [`FetchError`](crate::fetcher::FetchError) conversion, so exhausted retries
//!   surface with the same taxonomy as provider failures

use thiserror::Error;

use crate::fetcher::FetchError;

/// Errors that can occur during market data operations.
///
/// None of these escape a single symbol's lookup: the
/// [`MarketDataClient`](crate::MarketDataClient) logs them and reports the
/// symbol as "not found" so batch callers keep the rest of their results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// The requested symbol is unknown to the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol exists but the time-series window is empty.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider kept answering HTTP 429 after all retries.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request did not complete within the allotted time.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Transport-level failure (DNS, connection reset, TLS) after all retries.
    #[error("Network error: {provider} - {message}")]
    Network {
        /// The provider that could not be reached
        provider: String,
        /// Underlying transport message
        message: String,
    },

    /// The provider answered with a non-success status or an undecodable body.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The payload decoded but violates a model invariant
    /// (non-positive price, misaligned candle arrays, ...).
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },
}

impl MarketDataError {
    /// Whether the failure was transient (throttling or connectivity) rather
    /// than a property of the symbol or payload.
    ///
    /// ```
    /// use pricewatch_market_data::errors::MarketDataError;
    ///
    /// let error = MarketDataError::RateLimited { provider: "FINNHUB".to_string() };
    /// assert!(error.is_transient());
    ///
    /// let error = MarketDataError::SymbolNotFound("NOPE".to_string());
    /// assert!(!error.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network { .. }
        )
    }

    /// Wrap a fetcher error with the provider that issued the request.
    pub fn from_fetch(provider: &str, error: FetchError) -> Self {
        match error {
            FetchError::RateLimited { .. } => Self::RateLimited {
                provider: provider.to_string(),
            },
            FetchError::NetworkError { message, .. } => Self::Network {
                provider: provider.to_string(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(MarketDataError::Timeout {
            provider: "FINNHUB".to_string()
        }
        .is_transient());
        assert!(MarketDataError::Network {
            provider: "FINNHUB".to_string(),
            message: "connection reset".to_string()
        }
        .is_transient());
        assert!(!MarketDataError::NoDataForRange.is_transient());
        assert!(!MarketDataError::ValidationFailed {
            message: "c <= 0".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_from_fetch_keeps_kind() {
        let error =
            MarketDataError::from_fetch("FINNHUB", FetchError::RateLimited { attempts: 3 });
        assert_eq!(
            error,
            MarketDataError::RateLimited {
                provider: "FINNHUB".to_string()
            }
        );

        let error = MarketDataError::from_fetch(
            "FINNHUB",
            FetchError::NetworkError {
                attempts: 3,
                message: "dns failure".to_string(),
            },
        );
        assert_eq!(
            error,
            MarketDataError::Network {
                provider: "FINNHUB".to_string(),
                message: "dns failure".to_string()
            }
        );
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::ProviderError {
            provider: "FINNHUB".to_string(),
            message: "HTTP 500".to_string(),
        };
        assert_eq!(format!("{}", error), "Provider error: FINNHUB - HTTP 500");
    }
}
