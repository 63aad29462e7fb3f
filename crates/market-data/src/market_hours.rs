//! Regular-session market hours for the US equity exchanges.
//!
//! Holidays and early closes are not modelled; the result only drives
//! polling cadence.

use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Time zone the exchange session is defined in.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// 09:30 local, in minutes since midnight.
pub const SESSION_OPEN_MINUTE: u32 = 9 * 60 + 30;

/// 16:00 local, in minutes since midnight (exclusive).
pub const SESSION_CLOSE_MINUTE: u32 = 16 * 60;

/// Poll interval while the session is open.
pub const OPEN_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Poll interval outside the session.
pub const CLOSED_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Whether the regular session is open at `instant`.
pub fn is_market_open_at(instant: DateTime<Utc>) -> bool {
    let local = instant.with_timezone(&EXCHANGE_TZ);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let minutes = local.hour() * 60 + local.minute();
    (SESSION_OPEN_MINUTE..SESSION_CLOSE_MINUTE).contains(&minutes)
}

/// Whether the regular session is open right now.
pub fn is_market_open() -> bool {
    is_market_open_at(Utc::now())
}

/// Client polling cadence for `instant`.
pub fn poll_interval_at(instant: DateTime<Utc>) -> Duration {
    if is_market_open_at(instant) {
        OPEN_POLL_INTERVAL
    } else {
        CLOSED_POLL_INTERVAL
    }
}
