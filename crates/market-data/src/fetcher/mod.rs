//! Resilient HTTP fetcher.
//!
//! Issues a GET with a bounded number of retries. HTTP 429 and transport
//! failures are retried with separate linear backoffs; every other status is
//! handed back untouched, the body is never interpreted here.
//!
//! The fetcher holds no mutable state and is safe to share across tasks.

mod transport;

pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// HTTP status returned by providers when throttling.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Terminal failure after all attempts were used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Every attempt answered HTTP 429.
    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// The last attempt failed at the transport level.
    #[error("Network error after {attempts} attempts: {message}")]
    NetworkError { attempts: u32, message: String },
}

/// Retry policy for [`ResilientFetcher`].
///
/// Backoff is linear in the 1-based attempt index: after the first failed
/// attempt the fetcher waits `backoff * 1`, after the second `backoff * 2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Base delay after an HTTP 429.
    pub rate_limit_backoff: Duration,
    /// Base delay after a transport error.
    pub network_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            rate_limit_backoff: Duration::from_millis(1000),
            network_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_backoff * attempt
    }

    pub fn network_delay(&self, attempt: u32) -> Duration {
        self.network_backoff * attempt
    }
}

/// HTTP GET with retry and backoff on top of an [`HttpTransport`].
#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url`, retrying throttled and failed attempts.
    ///
    /// Any response other than HTTP 429 is returned as-is, including error
    /// statuses; the caller decides what a 404 or 500 means.
    pub async fn fetch(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let total = self.policy.total_attempts();
        let mut attempt = 1;

        loop {
            match self.transport.get(url).await {
                Ok(response) if response.status == STATUS_TOO_MANY_REQUESTS => {
                    if attempt >= total {
                        warn!("Rate limited on {} after {} attempts", url, attempt);
                        return Err(FetchError::RateLimited { attempts: attempt });
                    }
                    let delay = self.policy.rate_limit_delay(attempt);
                    warn!(
                        "Rate limited on {} (attempt {}/{}), retrying in {:?}",
                        url, attempt, total, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => {
                    debug!("GET {} -> {} (attempt {})", url, response.status, attempt);
                    return Ok(response);
                }
                Err(error) => {
                    if attempt >= total {
                        warn!("GET {} failed after {} attempts: {}", url, attempt, error);
                        return Err(FetchError::NetworkError {
                            attempts: attempt,
                            message: error.to_string(),
                        });
                    }
                    let delay = self.policy.network_delay(attempt);
                    warn!(
                        "GET {} failed (attempt {}/{}): {}, retrying in {:?}",
                        url, attempt, total, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
            attempt += 1;
        }
    }
}
