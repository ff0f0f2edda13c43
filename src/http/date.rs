//! RFC 7231 HTTP-date parsing and formatting

use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse an HTTP date in any of the three RFC 7231 formats, with an
/// RFC 2822 fallback for tolerant handling of near-miss values.
///
/// Returns `None` for unrecognized formats and pre-epoch dates.
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    // IMF-fixdate, the preferred form: "Sun, 06 Nov 1994 08:49:37 GMT".
    // The zone is a literal, so the naive parser applies and the result
    // is taken as UTC.
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%a, %d %b %Y %H:%M:%S GMT") {
        return from_timestamp(dt.and_utc().timestamp());
    }
    // Obsolete RFC 850 form: "Sunday, 06-Nov-94 08:49:37 GMT"
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%A, %d-%b-%y %H:%M:%S GMT") {
        return from_timestamp(dt.and_utc().timestamp());
    }
    // ANSI C asctime form, no zone: "Sun Nov  6 08:49:37 1994"
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%a %b %e %H:%M:%S %Y") {
        return from_timestamp(dt.and_utc().timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return from_timestamp(dt.timestamp());
    }
    None
}

fn from_timestamp(secs: i64) -> Option<SystemTime> {
    if secs >= 0 {
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64))
    } else {
        None
    }
}

/// Format a timestamp as an IMF-fixdate string.
pub fn format_http_date(time: SystemTime) -> String {
    let secs = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let dt = DateTime::<Utc>::from_timestamp(secs as i64, 0).unwrap_or_default();
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imf_fixdate_round_trip() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").expect("imf-fixdate");
        assert_eq!(format_http_date(parsed), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_obsolete_formats_parse() {
        let imf = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").expect("imf-fixdate");
        let rfc850 = parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT").expect("rfc 850");
        let asctime = parse_http_date("Sun Nov  6 08:49:37 1994").expect("asctime");
        assert_eq!(imf, rfc850);
        assert_eq!(imf, asctime);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_http_date("not a date").is_none());
        assert!(parse_http_date("").is_none());
    }
}
