use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, IF_NONE_MATCH};
use http::{HeaderMap, Method, StatusCode};

use courier::http::date::format_http_date;
use courier::prelude::*;

/// Downstream stand-in for the execution loop.
struct UpstreamChain {
    status: StatusCode,
    calls: AtomicUsize,
    saw_if_none_match: AtomicUsize,
}

impl UpstreamChain {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
            saw_if_none_match: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClientExecChain for UpstreamChain {
    fn execute(
        &self,
        _route: &HttpRoute,
        request: Request,
        _context: &mut ClientContext,
        _aware: Option<&dyn ExecutionAware>,
    ) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.contains_header(&IF_NONE_MATCH) {
            self.saw_if_none_match.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Response::new(self.status))
    }
}

struct FixedCache {
    entry: Option<CacheEntry>,
}

impl HttpCache for FixedCache {
    fn entry(&self, _target: &HttpHost, _request: &Request) -> Option<CacheEntry> {
        self.entry.clone()
    }
}

fn entry_with(headers: Vec<(&str, String)>, body: &[u8], stored_secs_ago: u64) -> CacheEntry {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(
            HeaderName::from_bytes(name.as_bytes()).expect("header name"),
            HeaderValue::from_str(&value).expect("header value"),
        );
    }
    let response_time = SystemTime::now() - Duration::from_secs(stored_secs_ago);
    CacheEntry::new(
        StatusCode::OK,
        Some("OK".to_string()),
        map,
        Some(Resource::new(Bytes::copy_from_slice(body))),
        response_time,
        response_time,
    )
}

fn fresh_entry() -> CacheEntry {
    entry_with(
        vec![
            ("date", format_http_date(SystemTime::now())),
            ("cache-control", "max-age=3600".to_string()),
            ("etag", "\"v1\"".to_string()),
        ],
        b"cached",
        0,
    )
}

fn stale_entry() -> CacheEntry {
    entry_with(
        vec![
            ("date", format_http_date(SystemTime::now() - Duration::from_secs(7200))),
            ("cache-control", "max-age=60".to_string()),
            ("etag", "\"v1\"".to_string()),
        ],
        b"cached",
        7200,
    )
}

fn route() -> HttpRoute {
    HttpRoute::direct(HttpHost::http("www.example.com", 80), false)
}

#[test]
fn test_fresh_entry_short_circuits_the_chain() {
    let upstream = Arc::new(UpstreamChain::new(StatusCode::OK));
    let stage = CachingExec::new(upstream.clone(), Arc::new(FixedCache { entry: Some(fresh_entry()) }));
    let mut context = ClientContext::new();

    let response = stage
        .execute(&route(), Request::new(Method::GET, "/doc"), &mut context, None)
        .expect("served from cache");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(matches!(response.body(), ResponseBody::Buffered(b) if b.as_ref() == b"cached"));
    assert!(response.headers().contains_key("age"));
    assert_eq!(upstream.calls(), 0);
}

#[test]
fn test_fresh_entry_with_matching_conditional_yields_304() {
    let upstream = Arc::new(UpstreamChain::new(StatusCode::OK));
    let stage = CachingExec::new(upstream.clone(), Arc::new(FixedCache { entry: Some(fresh_entry()) }));
    let mut context = ClientContext::new();

    let mut request = Request::new(Method::GET, "/doc");
    request.set_header(IF_NONE_MATCH, HeaderValue::from_static("\"v1\""));

    let response = stage
        .execute(&route(), request, &mut context, None)
        .expect("not modified");

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(!response.body().is_present());
    assert_eq!(upstream.calls(), 0);
}

#[test]
fn test_stale_entry_revalidates_with_conditional_headers() {
    let upstream = Arc::new(UpstreamChain::new(StatusCode::NOT_MODIFIED));
    let stage = CachingExec::new(upstream.clone(), Arc::new(FixedCache { entry: Some(stale_entry()) }));
    let mut context = ClientContext::new();

    let response = stage
        .execute(&route(), Request::new(Method::GET, "/doc"), &mut context, None)
        .expect("revalidated");

    // the upstream 304 is converted back into a full stored response
    assert_eq!(response.status(), StatusCode::OK);
    assert!(matches!(response.body(), ResponseBody::Buffered(b) if b.as_ref() == b"cached"));
    assert_eq!(upstream.calls(), 1);
    assert_eq!(upstream.saw_if_none_match.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stale_entry_passes_fresh_upstream_response_through() {
    let upstream = Arc::new(UpstreamChain::new(StatusCode::OK));
    let stage = CachingExec::new(upstream.clone(), Arc::new(FixedCache { entry: Some(stale_entry()) }));
    let mut context = ClientContext::new();

    let response = stage
        .execute(&route(), Request::new(Method::GET, "/doc"), &mut context, None)
        .expect("upstream response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(upstream.calls(), 1);
}

#[test]
fn test_cache_miss_forwards_untouched() {
    let upstream = Arc::new(UpstreamChain::new(StatusCode::OK));
    let stage = CachingExec::new(upstream.clone(), Arc::new(FixedCache { entry: None }));
    let mut context = ClientContext::new();

    stage
        .execute(&route(), Request::new(Method::GET, "/doc"), &mut context, None)
        .expect("forwarded");

    assert_eq!(upstream.calls(), 1);
    assert_eq!(upstream.saw_if_none_match.load(Ordering::SeqCst), 0);
}

#[test]
fn test_non_cacheable_methods_bypass_the_cache() {
    let upstream = Arc::new(UpstreamChain::new(StatusCode::OK));
    let stage = CachingExec::new(upstream.clone(), Arc::new(FixedCache { entry: Some(fresh_entry()) }));
    let mut context = ClientContext::new();

    stage
        .execute(&route(), Request::new(Method::POST, "/doc"), &mut context, None)
        .expect("forwarded");

    assert_eq!(upstream.calls(), 1);
}
