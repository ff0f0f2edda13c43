//! Freshness and age arithmetic for stored responses

use std::time::SystemTime;

use http::header::{AGE, CACHE_CONTROL, EXPIRES};

use crate::http::date;

use super::CacheEntry;

/// Substituted for malformed or negative `Age` header values: the entry
/// is treated as ancient rather than fresh.
const MALFORMED_AGE_SECS: u64 = 2_147_483_648;

/// Computes current age and freshness lifetime from an entry's stored
/// timestamps and headers, in whole seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheValidityPolicy;

impl CacheValidityPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Current age of the entry at `now`.
    pub fn current_age_secs(&self, entry: &CacheEntry, now: SystemTime) -> u64 {
        self.corrected_initial_age_secs(entry) + self.resident_time_secs(entry, now)
    }

    /// Freshness lifetime: `s-maxage`, then `max-age`, then `Expires`
    /// minus `Date`; zero when nothing applies.
    pub fn freshness_lifetime_secs(&self, entry: &CacheEntry) -> u64 {
        if let Some(secs) = self.cache_control_directive(entry, "s-maxage") {
            return secs;
        }
        if let Some(secs) = self.cache_control_directive(entry, "max-age") {
            return secs;
        }
        if let (Some(expires), Some(date_value)) = (self.expires(entry), entry.date()) {
            return secs_between(date_value, expires);
        }
        0
    }

    /// Whether the entry may be served without revalidation at `now`.
    pub fn is_response_fresh(&self, entry: &CacheEntry, now: SystemTime) -> bool {
        self.current_age_secs(entry, now) < self.freshness_lifetime_secs(entry)
    }

    /// Clock delta between the origin's `Date` and our receipt time,
    /// floored at zero.
    fn apparent_age_secs(&self, entry: &CacheEntry) -> u64 {
        match entry.date() {
            Some(date_value) => secs_between(date_value, entry.response_time()),
            None => 0,
        }
    }

    /// Largest `Age` header value; malformed values count as ancient.
    fn age_value_secs(&self, entry: &CacheEntry) -> u64 {
        let mut age = 0u64;
        for value in entry.headers().get_all(AGE) {
            let parsed = value
                .to_str()
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(MALFORMED_AGE_SECS);
            age = age.max(parsed);
        }
        age
    }

    fn corrected_received_age_secs(&self, entry: &CacheEntry) -> u64 {
        self.apparent_age_secs(entry).max(self.age_value_secs(entry))
    }

    fn response_delay_secs(&self, entry: &CacheEntry) -> u64 {
        secs_between(entry.request_time(), entry.response_time())
    }

    fn corrected_initial_age_secs(&self, entry: &CacheEntry) -> u64 {
        self.corrected_received_age_secs(entry) + self.response_delay_secs(entry)
    }

    fn resident_time_secs(&self, entry: &CacheEntry, now: SystemTime) -> u64 {
        secs_between(entry.response_time(), now)
    }

    fn cache_control_directive(&self, entry: &CacheEntry, directive: &str) -> Option<u64> {
        for value in entry.headers().get_all(CACHE_CONTROL) {
            let Ok(text) = value.to_str() else { continue };
            for part in text.split(',') {
                let mut kv = part.trim().splitn(2, '=');
                let name = kv.next().unwrap_or_default();
                if name.trim().eq_ignore_ascii_case(directive) {
                    if let Some(secs) = kv
                        .next()
                        .and_then(|v| v.trim().trim_matches('"').parse::<u64>().ok())
                    {
                        return Some(secs);
                    }
                }
            }
        }
        None
    }

    fn expires(&self, entry: &CacheEntry) -> Option<SystemTime> {
        entry
            .first_header_str(&EXPIRES)
            .and_then(date::parse_http_date)
    }
}

/// Whole seconds from `earlier` to `later`, zero when out of order.
fn secs_between(earlier: SystemTime, later: SystemTime) -> u64 {
    later
        .duration_since(earlier)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::header::{HeaderName, HeaderValue};
    use http::{HeaderMap, StatusCode};

    use super::*;

    const EPOCH_BASE: u64 = 1_700_000_000;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(EPOCH_BASE + secs)
    }

    fn create_test_entry(headers: Vec<(&str, String)>) -> CacheEntry {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).expect("header name"),
                HeaderValue::from_str(&value).expect("header value"),
            );
        }
        // request sent at t=0, response received at t=2
        CacheEntry::new(StatusCode::OK, Some("OK".to_string()), map, None, at(0), at(2))
    }

    #[test]
    fn test_current_age_includes_response_delay_and_residency() {
        let entry = create_test_entry(vec![("date", date::format_http_date(at(0)))]);
        // apparent age 2, delay 2, resident 10
        assert_eq!(CacheValidityPolicy.current_age_secs(&entry, at(12)), 14);
    }

    #[test]
    fn test_age_header_dominates_apparent_age() {
        let entry = create_test_entry(vec![
            ("date", date::format_http_date(at(0))),
            ("age", "100".to_string()),
        ]);
        // corrected received age 100, delay 2, resident 0
        assert_eq!(CacheValidityPolicy.current_age_secs(&entry, at(2)), 102);
    }

    #[test]
    fn test_malformed_age_counts_as_ancient() {
        let entry = create_test_entry(vec![("age", "not-a-number".to_string())]);
        assert!(CacheValidityPolicy.current_age_secs(&entry, at(2)) >= MALFORMED_AGE_SECS);
    }

    #[test]
    fn test_s_maxage_takes_precedence() {
        let entry = create_test_entry(vec![(
            "cache-control",
            "max-age=10, s-maxage=60".to_string(),
        )]);
        assert_eq!(CacheValidityPolicy.freshness_lifetime_secs(&entry), 60);
    }

    #[test]
    fn test_expires_fallback() {
        let entry = create_test_entry(vec![
            ("date", date::format_http_date(at(0))),
            ("expires", date::format_http_date(at(300))),
        ]);
        assert_eq!(CacheValidityPolicy.freshness_lifetime_secs(&entry), 300);
    }

    #[test]
    fn test_freshness_comparison() {
        let entry = create_test_entry(vec![
            ("date", date::format_http_date(at(2))),
            ("cache-control", "max-age=60".to_string()),
        ]);
        assert!(CacheValidityPolicy.is_response_fresh(&entry, at(10)));
        assert!(!CacheValidityPolicy.is_response_fresh(&entry, at(120)));
    }
}
