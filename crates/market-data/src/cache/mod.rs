//! In-memory TTL cache for market data.
//!
//! One map from [`CacheKey`] to `(value, expiry)`. Reads past the expiry are
//! misses: a stale value is never handed out, not even as a fallback.
//!
//! The map is sharded ([`DashMap`]) so readers and writers of different keys
//! do not contend. Entries live until they expire and are evicted either
//! lazily on read or by [`MarketDataCache::purge_expired`].
//!
//! The cache is process-local and reset on restart.

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{canonical_symbol, CandleRequest, CandleSeries, CompanyProfile, Quote, Resolution};

/// Kind of data stored under a key; selects the TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    Quote,
    Candles,
    Profile,
}

/// Composite cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Quote {
        symbol: String,
    },
    Candles {
        symbol: String,
        resolution: Resolution,
        from: i64,
        to: i64,
    },
    Profile {
        symbol: String,
    },
}

impl CacheKey {
    pub fn quote(symbol: &str) -> Self {
        Self::Quote {
            symbol: canonical_symbol(symbol),
        }
    }

    pub fn candles(request: &CandleRequest) -> Self {
        Self::Candles {
            symbol: canonical_symbol(&request.symbol),
            resolution: request.resolution,
            from: request.from,
            to: request.to,
        }
    }

    pub fn profile(symbol: &str) -> Self {
        Self::Profile {
            symbol: canonical_symbol(symbol),
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            Self::Quote { .. } => DataKind::Quote,
            Self::Candles { .. } => DataKind::Candles,
            Self::Profile { .. } => DataKind::Profile,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quote { symbol } => write!(f, "quote:{}", symbol),
            Self::Candles {
                symbol,
                resolution,
                from,
                to,
            } => write!(f, "candle:{}:{}:{}:{}", symbol, resolution, from, to),
            Self::Profile { symbol } => write!(f, "profile:{}", symbol),
        }
    }
}

/// Cached payload.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheValue {
    Quote(Quote),
    Candles(CandleSeries),
    Profile(CompanyProfile),
}

impl CacheValue {
    /// Model invariants that must hold before a value is stored.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Quote(quote) => quote.is_valid(),
            Self::Candles(series) => series.is_valid(),
            Self::Profile(_) => true,
        }
    }
}

/// Types that can be stored in the cache.
pub trait Cacheable: Sized {
    fn into_cache_value(self) -> CacheValue;
    fn from_cache_value(value: CacheValue) -> Option<Self>;
}

impl Cacheable for Quote {
    fn into_cache_value(self) -> CacheValue {
        CacheValue::Quote(self)
    }

    fn from_cache_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Quote(quote) => Some(quote),
            _ => None,
        }
    }
}

impl Cacheable for CandleSeries {
    fn into_cache_value(self) -> CacheValue {
        CacheValue::Candles(self)
    }

    fn from_cache_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Candles(series) => Some(series),
            _ => None,
        }
    }
}

impl Cacheable for CompanyProfile {
    fn into_cache_value(self) -> CacheValue {
        CacheValue::Profile(self)
    }

    fn from_cache_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Profile(profile) => Some(profile),
            _ => None,
        }
    }
}

/// Per-kind time-to-live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheTtls {
    pub quote: Duration,
    pub candles: Duration,
    pub profile: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            quote: Duration::from_secs(10),
            candles: Duration::from_secs(60),
            profile: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl CacheTtls {
    pub fn for_kind(&self, kind: DataKind) -> Duration {
        match kind {
            DataKind::Quote => self.quote,
            DataKind::Candles => self.candles,
            DataKind::Profile => self.profile,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: CacheValue,
    expires_at: Instant,
}

/// Thread-safe TTL cache keyed by [`CacheKey`].
#[derive(Debug, Default)]
pub struct MarketDataCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttls: CacheTtls,
}

impl MarketDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttls(ttls: CacheTtls) -> Self {
        Self {
            entries: DashMap::new(),
            ttls,
        }
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Return the value for `key` if it has not expired.
    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if now <= entry.expires_at => {
                debug!("Cache hit: {}", key);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| now > entry.expires_at);
            debug!("Cache expired: {}", key);
        }
        None
    }

    /// Typed variant of [`get`](Self::get).
    pub fn get_as<T: Cacheable>(&self, key: &CacheKey) -> Option<T> {
        self.get(key).and_then(T::from_cache_value)
    }

    /// Store `value` under `key` for `ttl`.
    pub fn put(&self, key: CacheKey, value: CacheValue, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Store `value` using the TTL of the key's [`DataKind`].
    pub fn put_for_kind(&self, key: CacheKey, value: CacheValue) {
        let ttl = self.ttls.for_kind(key.kind());
        self.put(key, value, ttl);
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
