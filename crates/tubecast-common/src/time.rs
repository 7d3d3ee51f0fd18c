//! Upstream timestamp normalization
//!
//! Listing backends report publish times in slightly different shapes:
//! RFC 3339 with an offset, the same with a trailing `Z`, or a naive
//! datetime with no zone at all. Everything is normalized to
//! `DateTime<Utc>` before it reaches the catalog; naive timestamps are
//! treated as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse an upstream publish timestamp into UTC.
///
/// Returns `None` for unparseable input rather than erroring; a video
/// without a usable upload time is a data-quality event the inclusion
/// policy handles downstream.
pub fn parse_upstream_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Naive timestamps are treated as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parses_rfc3339_with_zulu() {
        let parsed = parse_upstream_timestamp("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_parses_rfc3339_with_offset() {
        let parsed = parse_upstream_timestamp("2024-03-01T14:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_naive_timestamp_is_treated_as_utc() {
        let parsed = parse_upstream_timestamp("2024-03-01T12:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_fractional_seconds() {
        let parsed = parse_upstream_timestamp("2024-03-01T12:30:00.500").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse_upstream_timestamp("").is_none());
        assert!(parse_upstream_timestamp("not a date").is_none());
    }
}
