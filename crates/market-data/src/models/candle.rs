use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::canonical_symbol;
use crate::errors::MarketDataError;

/// Seconds in one calendar day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Default look-back window when no `from` is supplied.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

/// Candle width supported by the provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// One-minute candles
    #[serde(rename = "1")]
    Minute,
    /// Daily candles
    #[default]
    #[serde(rename = "D")]
    Day,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "1",
            Self::Day => "D",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::Minute),
            "D" | "d" => Ok(Self::Day),
            other => Err(MarketDataError::ValidationFailed {
                message: format!("Unsupported resolution: {}", other),
            }),
        }
    }
}

/// Fully-resolved parameters of a candle lookup.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CandleRequest {
    pub symbol: String,
    pub resolution: Resolution,
    /// Window start, unix seconds
    pub from: i64,
    /// Window end, unix seconds
    pub to: i64,
}

impl CandleRequest {
    /// Apply defaults: `to` = `now`, `from` = `to` minus one year.
    pub fn new(
        symbol: &str,
        resolution: Resolution,
        from: Option<i64>,
        to: Option<i64>,
        now: i64,
    ) -> Self {
        let to = to.unwrap_or(now);
        let from = from.unwrap_or(to - DEFAULT_LOOKBACK_DAYS * SECONDS_PER_DAY);
        Self {
            symbol: canonical_symbol(symbol),
            resolution,
            from,
            to,
        }
    }

    /// Whole days covered by the window (zero when inverted).
    pub fn days_in_range(&self) -> i64 {
        ((self.to - self.from) / SECONDS_PER_DAY).max(0)
    }
}

/// OHLCV time series with index-aligned arrays.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandleSeries {
    pub symbol: String,
    pub resolution: Resolution,
    pub open: Vec<Decimal>,
    pub high: Vec<Decimal>,
    pub low: Vec<Decimal>,
    pub close: Vec<Decimal>,
    pub volume: Vec<Decimal>,
    /// Unix seconds, strictly increasing
    pub timestamps: Vec<i64>,
}

/// One row of a series, used to assemble and order provider data.
#[derive(Clone, Debug, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl CandleSeries {
    /// Build a series from rows that must already be in strictly increasing
    /// timestamp order. Empty input is reported as [`MarketDataError::NoDataForRange`].
    pub fn from_candles(
        symbol: &str,
        resolution: Resolution,
        candles: Vec<Candle>,
    ) -> Result<Self, MarketDataError> {
        if candles.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }
        if let Some(pair) = candles
            .windows(2)
            .find(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(MarketDataError::ValidationFailed {
                message: format!(
                    "Candle timestamps not strictly increasing: {} then {}",
                    pair[0].timestamp, pair[1].timestamp
                ),
            });
        }

        let len = candles.len();
        let mut series = Self {
            symbol: canonical_symbol(symbol),
            resolution,
            open: Vec::with_capacity(len),
            high: Vec::with_capacity(len),
            low: Vec::with_capacity(len),
            close: Vec::with_capacity(len),
            volume: Vec::with_capacity(len),
            timestamps: Vec::with_capacity(len),
        };
        for candle in candles {
            series.timestamps.push(candle.timestamp);
            series.open.push(candle.open);
            series.high.push(candle.high);
            series.low.push(candle.low);
            series.close.push(candle.close);
            series.volume.push(candle.volume);
        }
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Aligned arrays, non-empty, strictly increasing timestamps.
    pub fn is_valid(&self) -> bool {
        let len = self.timestamps.len();
        len > 0
            && self.open.len() == len
            && self.high.len() == len
            && self.low.len() == len
            && self.close.len() == len
            && self.volume.len() == len
            && self.timestamps.windows(2).all(|pair| pair[0] < pair[1])
    }

    pub fn last_close(&self) -> Option<Decimal> {
        self.close.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(timestamp: i64, close: Decimal) -> Candle {
        Candle {
            timestamp,
            open: close,
            high: close + dec!(1),
            low: close - dec!(1),
            close,
            volume: dec!(1000),
        }
    }

    #[test]
    fn test_request_defaults() {
        let now = 1_700_000_000;
        let request = CandleRequest::new("aapl", Resolution::Day, None, None, now);
        assert_eq!(request.symbol, "AAPL");
        assert_eq!(request.to, now);
        assert_eq!(request.from, now - 365 * SECONDS_PER_DAY);
        assert_eq!(request.days_in_range(), 365);
    }

    #[test]
    fn test_days_in_range_inverted_window() {
        let request = CandleRequest::new("AAPL", Resolution::Day, Some(100), Some(50), 0);
        assert_eq!(request.days_in_range(), 0);
    }

    #[test]
    fn test_series_from_candles() {
        let series = CandleSeries::from_candles(
            "msft",
            Resolution::Day,
            vec![candle(1, dec!(10)), candle(2, dec!(11)), candle(3, dec!(12))],
        )
        .unwrap();
        assert_eq!(series.symbol, "MSFT");
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_close(), Some(dec!(12)));
        assert!(series.is_valid());
    }

    #[test]
    fn test_series_rejects_empty() {
        let result = CandleSeries::from_candles("MSFT", Resolution::Day, vec![]);
        assert_eq!(result, Err(MarketDataError::NoDataForRange));
    }

    #[test]
    fn test_series_rejects_unordered_timestamps() {
        let result = CandleSeries::from_candles(
            "MSFT",
            Resolution::Day,
            vec![candle(2, dec!(10)), candle(2, dec!(11))],
        );
        assert!(matches!(
            result,
            Err(MarketDataError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!("D".parse::<Resolution>().unwrap(), Resolution::Day);
        assert_eq!("1".parse::<Resolution>().unwrap(), Resolution::Minute);
        assert!("W".parse::<Resolution>().is_err());
    }
}
