//! Synthetic market data for running without a provider credential.
//!
//! Quotes and profiles come from a fixed table of well-known symbols; any
//! other symbol gets a neutral placeholder. Candles are a random walk
//! anchored at the symbol's demo price.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::MarketDataError;
use crate::models::{
    canonical_symbol, round_cents, Candle, CandleRequest, CandleSeries, CompanyProfile,
    ProviderId, Quote, DEFAULT_LOOKBACK_DAYS, SECONDS_PER_DAY,
};
use crate::provider::MarketDataProvider;

const PROVIDER_ID: &str = "DEMO";

const MIN_CANDLES: i64 = 2;
const MAX_CANDLES: i64 = DEFAULT_LOOKBACK_DAYS;
const DEMO_VOLUME: Decimal = dec!(1000000);

/// One row of the demo table.
struct DemoSymbol {
    symbol: &'static str,
    name: &'static str,
    price: Decimal,
    previous_close: Decimal,
    open: Decimal,
    high: Decimal,
    low: Decimal,
}

const DEMO_EXCHANGE: &str = "NASDAQ";

const DEMO_SYMBOLS: &[DemoSymbol] = &[
    DemoSymbol {
        symbol: "AAPL",
        name: "Apple Inc",
        price: dec!(228.5),
        previous_close: dec!(226.4),
        open: dec!(226),
        high: dec!(229),
        low: dec!(225),
    },
    DemoSymbol {
        symbol: "TSLA",
        name: "Tesla Inc",
        price: dec!(248.2),
        previous_close: dec!(251.7),
        open: dec!(251),
        high: dec!(252),
        low: dec!(246),
    },
    DemoSymbol {
        symbol: "NVDA",
        name: "NVIDIA Corporation",
        price: dec!(135.8),
        previous_close: dec!(131.6),
        open: dec!(132),
        high: dec!(136),
        low: dec!(131),
    },
    DemoSymbol {
        symbol: "GOOGL",
        name: "Alphabet Inc",
        price: dec!(175.3),
        previous_close: dec!(174.1),
        open: dec!(174),
        high: dec!(176),
        low: dec!(173),
    },
    DemoSymbol {
        symbol: "MSFT",
        name: "Microsoft Corporation",
        price: dec!(415.5),
        previous_close: dec!(412.7),
        open: dec!(413),
        high: dec!(416),
        low: dec!(412),
    },
    DemoSymbol {
        symbol: "AMZN",
        name: "Amazon.com Inc",
        price: dec!(198.2),
        previous_close: dec!(199.3),
        open: dec!(199),
        high: dec!(200),
        low: dec!(197),
    },
];

/// Price of the placeholder quote served for unknown symbols.
const PLACEHOLDER_PRICE: Decimal = dec!(100);

fn lookup(symbol: &str) -> Option<&'static DemoSymbol> {
    DEMO_SYMBOLS.iter().find(|row| row.symbol == symbol)
}

/// Symbols with hand-written demo data.
pub fn demo_symbols() -> impl Iterator<Item = &'static str> {
    DEMO_SYMBOLS.iter().map(|row| row.symbol)
}

/// Provider serving synthetic data.
pub struct DemoProvider {
    rng: Mutex<StdRng>,
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Provider with a reproducible candle walk.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn anchor_price(symbol: &str) -> Decimal {
        lookup(symbol)
            .map(|row| row.price)
            .unwrap_or(PLACEHOLDER_PRICE)
    }

    /// Multiplicative walk with steps in [-2%, +2%], starting at `start`.
    fn random_walk(&self, start: Decimal, len: usize) -> Vec<Decimal> {
        let mut closes = Vec::with_capacity(len);
        let mut price = start;
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for _ in 0..len {
            // step in basis points
            let step: i64 = rng.gen_range(-200..=200);
            price *= Decimal::ONE + Decimal::new(step, 4);
            closes.push(round_cents(price));
        }
        closes
    }
}

#[async_trait]
impl MarketDataProvider for DemoProvider {
    fn id(&self) -> ProviderId {
        PROVIDER_ID
    }

    fn is_demo(&self) -> bool {
        true
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let symbol = canonical_symbol(symbol);
        let now = Utc::now();

        match lookup(&symbol) {
            Some(row) => Ok(
                Quote::new(&symbol, row.price, row.previous_close, now, PROVIDER_ID)?
                    .with_day_range(Some(row.open), Some(row.high), Some(row.low)),
            ),
            None => Ok(Quote::new(
                &symbol,
                PLACEHOLDER_PRICE,
                PLACEHOLDER_PRICE,
                now,
                PROVIDER_ID,
            )?
            .with_day_range(
                Some(PLACEHOLDER_PRICE),
                Some(PLACEHOLDER_PRICE),
                Some(PLACEHOLDER_PRICE),
            )),
        }
    }

    async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries, MarketDataError> {
        let len = request.days_in_range().clamp(MIN_CANDLES, MAX_CANDLES);
        let closes = self.random_walk(Self::anchor_price(&request.symbol), len as usize);

        let mut previous_close = None;
        let candles = closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| {
                let open = previous_close.unwrap_or(close);
                previous_close = Some(close);
                Candle {
                    timestamp: request.from + i as i64 * SECONDS_PER_DAY,
                    open,
                    high: round_cents(close * dec!(1.01)),
                    low: round_cents(close * dec!(0.99)),
                    close,
                    volume: DEMO_VOLUME,
                }
            })
            .collect();

        CandleSeries::from_candles(&request.symbol, request.resolution, candles)
    }

    async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketDataError> {
        let symbol = canonical_symbol(symbol);
        Ok(match lookup(&symbol) {
            Some(row) => CompanyProfile::new(row.symbol, row.name, DEMO_EXCHANGE),
            None => CompanyProfile::unknown(&symbol),
        })
    }
}
