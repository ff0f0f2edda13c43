//! Synthesizes RFC-compliant responses from cache entries

use std::time::SystemTime;

use http::header::{
    AGE, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_LOCATION, DATE, ETAG, EXPIRES, TRANSFER_ENCODING,
    VARY,
};
use http::{HeaderValue, Method, StatusCode};

use crate::http::{date, Request, Response, ResponseBody};

use super::{CacheEntry, CacheValidityPolicy};

/// Decimal emitted once the computed age reaches the clamp threshold.
const AGE_CLAMP_VALUE: &str = "2147483648";

/// Rebuilds live responses out of stored cache entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct CachedResponseGenerator {
    validity: CacheValidityPolicy,
}

impl CachedResponseGenerator {
    pub fn new(validity: CacheValidityPolicy) -> Self {
        Self { validity }
    }

    /// Reconstruct the stored response for `request`.
    ///
    /// Copies the entry's status line and every stored header. GET
    /// requests against an entry with a body get a buffered entity and a
    /// synthesized `Content-Length`, unless the entry used
    /// `Transfer-Encoding`, which takes precedence and leaves the length
    /// unspecified. The entry's current age is emitted as a
    /// decimal-seconds `Age` header, clamped at the representable
    /// maximum.
    pub fn generate_response(&self, request: &Request, entry: &CacheEntry) -> Response {
        let now = SystemTime::now();
        let mut response = Response::new(entry.status());
        if let Some(reason) = entry.reason() {
            response.set_reason(reason.to_string());
        }
        for (name, value) in entry.headers() {
            response.headers_mut().append(name.clone(), value.clone());
        }

        if *request.method() == Method::GET {
            if let Some(resource) = entry.resource() {
                self.add_missing_content_length(&mut response, resource.len());
                response.set_body(ResponseBody::Buffered(resource.bytes()));
            }
        }

        let age = self.validity.current_age_secs(entry, now);
        let age_text = if age >= i32::MAX as u64 {
            AGE_CLAMP_VALUE.to_string()
        } else {
            age.to_string()
        };
        if let Ok(value) = HeaderValue::from_str(&age_text) {
            response.headers_mut().insert(AGE, value);
        }

        response
    }

    /// Build the 304 answering a conditional request that matched
    /// `entry`.
    ///
    /// Carries exactly the fields a live 200 for the same variant would
    /// have carried: `Date` (synthesized as "now" if the entry lacks
    /// one), then `ETag`, `Content-Location`, `Expires`, `Cache-Control`
    /// and `Vary` when present. No body.
    pub fn generate_not_modified_response(&self, entry: &CacheEntry) -> Response {
        let mut response = Response::new(StatusCode::NOT_MODIFIED);
        response.set_reason("Not Modified");

        match entry.headers().get(DATE).cloned() {
            Some(value) => {
                response.headers_mut().insert(DATE, value);
            }
            None => {
                if let Ok(value) = HeaderValue::from_str(&date::format_http_date(SystemTime::now()))
                {
                    response.headers_mut().insert(DATE, value);
                }
            }
        }
        for name in [ETAG, CONTENT_LOCATION, EXPIRES, CACHE_CONTROL, VARY] {
            if let Some(value) = entry.headers().get(&name).cloned() {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }

    fn add_missing_content_length(&self, response: &mut Response, length: usize) {
        if response.headers().contains_key(TRANSFER_ENCODING) {
            return;
        }
        if !response.headers().contains_key(CONTENT_LENGTH) {
            if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
                response.headers_mut().insert(CONTENT_LENGTH, value);
            }
        }
    }
}
