//! Chain stage serving or revalidating stored responses

use std::sync::Arc;
use std::time::SystemTime;

use http::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use http::{HeaderValue, Method, StatusCode};
use tracing::debug;

use crate::context::ClientContext;
use crate::error::Result;
use crate::exec::{ClientExecChain, ExecutionAware};
use crate::http::{date, Request, Response};
use crate::route::{HttpHost, HttpRoute};

use super::{CacheEntry, CacheValidityPolicy, CachedResponseGenerator};

/// Read-only view of an external HTTP cache.
pub trait HttpCache: Send + Sync {
    /// The stored entry matching `request` against `target`, if any.
    fn entry(&self, target: &HttpHost, request: &Request) -> Option<CacheEntry>;
}

/// Cache stage: serves fresh entries, revalidates stale ones, forwards
/// everything else untouched.
///
/// Entry storage and header merging after revalidation belong to the
/// external cache; entries are consumed read-only here.
pub struct CachingExec {
    next: Arc<dyn ClientExecChain>,
    cache: Arc<dyn HttpCache>,
    validity: CacheValidityPolicy,
    generator: CachedResponseGenerator,
}

impl CachingExec {
    pub fn new(next: Arc<dyn ClientExecChain>, cache: Arc<dyn HttpCache>) -> Self {
        let validity = CacheValidityPolicy::new();
        Self {
            next,
            cache,
            validity,
            generator: CachedResponseGenerator::new(validity),
        }
    }

    /// Serve a 200 from the entry, or a 304 when the caller's own
    /// conditional headers match it.
    fn synthesize(&self, request: &Request, entry: &CacheEntry) -> Response {
        if request_is_conditional(request) && conditional_matches(request, entry) {
            self.generator.generate_not_modified_response(entry)
        } else {
            self.generator.generate_response(request, entry)
        }
    }
}

impl ClientExecChain for CachingExec {
    fn execute(
        &self,
        route: &HttpRoute,
        request: Request,
        context: &mut ClientContext,
        aware: Option<&dyn ExecutionAware>,
    ) -> Result<Response> {
        if *request.method() != Method::GET && *request.method() != Method::HEAD {
            return self.next.execute(route, request, context, aware);
        }
        let Some(entry) = self.cache.entry(route.target(), &request) else {
            return self.next.execute(route, request, context, aware);
        };

        let now = SystemTime::now();
        if self.validity.is_response_fresh(&entry, now) {
            debug!(target: "courier::cache", uri = request.uri(), "serving stored response");
            return Ok(self.synthesize(&request, &entry));
        }

        debug!(target: "courier::cache", uri = request.uri(), "stored response is stale; revalidating");
        let mut forward = request.clone();
        if let Some(etag) = entry.first_header_str(&ETAG) {
            if let Ok(value) = HeaderValue::from_str(etag) {
                forward.set_header(IF_NONE_MATCH, value);
            }
        } else if let Some(last_modified) = entry.first_header_str(&LAST_MODIFIED) {
            if let Ok(value) = HeaderValue::from_str(last_modified) {
                forward.set_header(IF_MODIFIED_SINCE, value);
            }
        }

        let upstream = self.next.execute(route, forward, context, aware)?;
        if upstream.status() == StatusCode::NOT_MODIFIED {
            debug!(target: "courier::cache", uri = request.uri(), "revalidated; serving stored response");
            upstream.close()?;
            return Ok(self.synthesize(&request, &entry));
        }
        Ok(upstream)
    }
}

fn request_is_conditional(request: &Request) -> bool {
    request.contains_header(&IF_NONE_MATCH) || request.contains_header(&IF_MODIFIED_SINCE)
}

/// `If-None-Match` against the entry's `ETag` decides when present;
/// otherwise `If-Modified-Since` against `Last-Modified`, falling back
/// to `Date`.
fn conditional_matches(request: &Request, entry: &CacheEntry) -> bool {
    if request.contains_header(&IF_NONE_MATCH) {
        let Some(entry_etag) = entry.first_header_str(&ETAG) else {
            return false;
        };
        return request.headers().get_all(IF_NONE_MATCH).iter().any(|value| {
            value
                .to_str()
                .map(|raw| {
                    raw.split(',').any(|candidate| {
                        let candidate = candidate.trim();
                        candidate == "*" || candidate == entry_etag
                    })
                })
                .unwrap_or(false)
        });
    }
    if let Some(since) = request
        .headers()
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(date::parse_http_date)
    {
        let modified = entry
            .first_header_str(&LAST_MODIFIED)
            .and_then(date::parse_http_date)
            .or_else(|| entry.date());
        if let Some(modified) = modified {
            return modified <= since;
        }
    }
    false
}
