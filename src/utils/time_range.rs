//! Time-range normalization for historical queries.
//!
//! The exchange wants unix-epoch seconds. Callers hand us whatever they
//! have - an epoch number, a `DateTime<Utc>`, or an RFC 3339 string - and
//! both ends of the range must convert independently before a request is
//! allowed to go out.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    #[error("epoch value is not a finite number: {0}")]
    NotFinite(f64),

    #[error("could not parse {0:?} as an RFC 3339 timestamp")]
    Unparseable(String),
}

/// A validated time range in unix-epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// An input value convertible to epoch seconds.
#[derive(Debug, Clone)]
pub enum TimeInput {
    /// Already-numeric unix-epoch seconds.
    Epoch(f64),
    /// A concrete point in time.
    DateTime(DateTime<Utc>),
    /// An RFC 3339 timestamp string.
    Text(String),
}

impl From<f64> for TimeInput {
    fn from(value: f64) -> Self {
        TimeInput::Epoch(value)
    }
}

impl From<i64> for TimeInput {
    fn from(value: i64) -> Self {
        TimeInput::Epoch(value as f64)
    }
}

impl From<u64> for TimeInput {
    fn from(value: u64) -> Self {
        TimeInput::Epoch(value as f64)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(value: DateTime<Utc>) -> Self {
        TimeInput::DateTime(value)
    }
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        TimeInput::Text(value.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(value: String) -> Self {
        TimeInput::Text(value)
    }
}

impl TimeInput {
    fn to_epoch(&self) -> Result<f64, RangeError> {
        match self {
            TimeInput::Epoch(secs) => {
                if secs.is_finite() {
                    Ok(*secs)
                } else {
                    Err(RangeError::NotFinite(*secs))
                }
            }
            TimeInput::DateTime(dt) => Ok(dt.timestamp_millis() as f64 / 1000.0),
            TimeInput::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp_millis() as f64 / 1000.0)
                .map_err(|_| RangeError::Unparseable(text.clone())),
        }
    }
}

/// Converts both ends of a requested range to unix-epoch seconds.
///
/// Fails if either end is not convertible; no partial result is produced.
pub fn normalize_range(
    start: impl Into<TimeInput>,
    end: impl Into<TimeInput>,
) -> Result<TimeRange, RangeError> {
    let start = start.into().to_epoch()?;
    let end = end.into().to_epoch()?;
    Ok(TimeRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_inputs_pass_through() {
        let range = normalize_range(1_500_000_000.0, 1_500_003_600.0).unwrap();
        assert_eq!(range.start, 1_500_000_000.0);
        assert_eq!(range.end, 1_500_003_600.0);
    }

    #[test]
    fn datetime_and_epoch_agree() {
        let dt = Utc.timestamp_opt(1_500_000_000, 0).unwrap();
        let from_dt = normalize_range(dt, dt).unwrap();
        let from_epoch = normalize_range(1_500_000_000i64, 1_500_000_000i64).unwrap();
        assert_eq!(from_dt, from_epoch);
    }

    #[test]
    fn rfc3339_text_converts() {
        let range = normalize_range("2017-07-14T02:40:00Z", "2017-07-14T03:40:00Z").unwrap();
        assert_eq!(range.start, 1_500_000_000.0);
        assert_eq!(range.end, 1_500_003_600.0);
    }

    #[test]
    fn unparseable_text_is_rejected() {
        let err = normalize_range("not a date", 1_500_000_000.0).unwrap_err();
        assert!(matches!(err, RangeError::Unparseable(_)));
    }

    #[test]
    fn non_finite_epoch_is_rejected() {
        assert!(matches!(
            normalize_range(f64::NAN, 1.0),
            Err(RangeError::NotFinite(_))
        ));
        assert!(matches!(
            normalize_range(1.0, f64::INFINITY),
            Err(RangeError::NotFinite(_))
        ));
    }

    #[test]
    fn failure_in_either_end_fails_the_whole_range() {
        assert!(normalize_range("bad", "2017-07-14T02:40:00Z").is_err());
        assert!(normalize_range("2017-07-14T02:40:00Z", "bad").is_err());
    }
}
