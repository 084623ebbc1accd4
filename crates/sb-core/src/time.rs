//! Time utilities for MCP Switchboard

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp as RFC 3339 with second precision and a `Z` suffix.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use sb_core::time::format_timestamp;
///
/// let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
/// assert_eq!(format_timestamp(&ts), "2024-05-01T12:30:00Z");
/// ```
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time, formatted with [`format_timestamp`]
pub fn now_string() -> String {
    format_timestamp(&Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_drops_subseconds() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(format_timestamp(&ts), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_now_string_is_parseable() {
        let s = now_string();
        assert!(DateTime::parse_from_rfc3339(&s).is_ok());
    }
}
