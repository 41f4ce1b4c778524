//! Timestamp value object for immutable points in time.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Immutable point in time, always UTC, with microsecond precision.
///
/// Serialized as a fixed-width RFC 3339 string (`2025-02-16T01:02:03.456789Z`)
/// so that stored timestamps order correctly as plain strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>, truncated to microseconds.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(dt))
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the stored string form.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dt = DateTime::<Utc>::deserialize(deserializer)?;
        Ok(Self::from_datetime(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now() - TimeDelta::microseconds(1);
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn serialized_form_has_fixed_width() {
        let whole = Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 2, 16, 1, 2, 3).unwrap());
        let json = serde_json::to_value(whole).unwrap();
        assert_eq!(json, serde_json::json!("2025-02-16T01:02:03.000000Z"));
    }

    #[test]
    fn string_order_matches_time_order() {
        let earlier = Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 2, 16, 1, 2, 3).unwrap());
        let later = Timestamp::from_datetime(
            Utc.with_ymd_and_hms(2025, 2, 16, 1, 2, 3).unwrap() + TimeDelta::milliseconds(500),
        );
        assert!(earlier.to_rfc3339() < later.to_rfc3339());
        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
    }

    #[test]
    fn round_trips_through_json() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn sub_microsecond_precision_is_dropped() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::nanoseconds(1_500);
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.as_datetime().timestamp_subsec_nanos(), 1_000);
    }
}
