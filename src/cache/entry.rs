//! Immutable snapshot of a stored response

use std::time::SystemTime;

use bytes::Bytes;
use http::header::{HeaderName, DATE};
use http::{HeaderMap, StatusCode};

use crate::http::date;

/// Body bytes held by a cache entry.
#[derive(Debug, Clone)]
pub struct Resource(Bytes);

impl Resource {
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bytes(&self) -> Bytes {
        self.0.clone()
    }
}

/// One stored response, produced by an external cache and consumed
/// read-only here.
///
/// `request_time` and `response_time` are the local clock readings taken
/// when the stored exchange was sent and received; the age arithmetic in
/// [`crate::cache::CacheValidityPolicy`] builds on them.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    resource: Option<Resource>,
    request_time: SystemTime,
    response_time: SystemTime,
}

impl CacheEntry {
    pub fn new(
        status: StatusCode,
        reason: Option<String>,
        headers: HeaderMap,
        resource: Option<Resource>,
        request_time: SystemTime,
        response_time: SystemTime,
    ) -> Self {
        Self {
            status,
            reason,
            headers,
            resource,
            request_time,
            response_time,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    pub fn request_time(&self) -> SystemTime {
        self.request_time
    }

    pub fn response_time(&self) -> SystemTime {
        self.response_time
    }

    /// First value of `name`, as a string, if readable.
    pub fn first_header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The entry's `Date` header, parsed.
    pub fn date(&self) -> Option<SystemTime> {
        self.first_header_str(&DATE).and_then(date::parse_http_date)
    }
}
