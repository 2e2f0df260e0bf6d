//! Wall-clock helpers. Everything time-dependent takes `now_ms` explicitly so
//! tests can drive it; only the edges of the system read the real clock.

use chrono::{DateTime, TimeZone, Utc};

/// Current Unix time in milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a UTC timestamp. `None` when out of range.
pub fn from_ms(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ms_round_trips_whole_millis() {
        let dt = from_ms(1_700_000_000_123).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_123);
    }
}
