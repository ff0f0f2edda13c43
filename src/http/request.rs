//! HTTP request representation used by the execution chain

use std::fmt;
use std::sync::Arc;

use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, Method, Version};

use crate::http::entity::EntityProducer;

/// An HTTP request as submitted to the execution chain.
///
/// Carries the request line, headers and an optional body producer.
#[derive(Clone)]
pub struct Request {
    method: Method,
    uri: String,
    version: Version,
    headers: HeaderMap,
    entity: Option<Arc<dyn EntityProducer>>,
}

impl Request {
    /// Create a request with the given method and request target.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            entity: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Whether at least one header with this name is set.
    pub fn contains_header(&self, name: &HeaderName) -> bool {
        self.headers.contains_key(name)
    }

    /// Replace all values of `name` with `value`.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Remove every value of `name`.
    pub fn remove_headers(&mut self, name: &HeaderName) {
        while self.headers.remove(name).is_some() {}
    }

    pub fn entity(&self) -> Option<&Arc<dyn EntityProducer>> {
        self.entity.as_ref()
    }

    pub fn set_entity(&mut self, entity: Arc<dyn EntityProducer>) {
        self.entity = Some(entity);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers.len())
            .field("entity", &self.entity.is_some())
            .finish()
    }
}

/// Working copy of a request plus the caller's original.
///
/// The execution loop mutates the working copy (injected auth headers,
/// headers stripped between rounds) and consults the original to know
/// which headers the caller set explicitly.
#[derive(Debug)]
pub struct RequestWrapper {
    request: Request,
    original: Request,
}

impl RequestWrapper {
    pub fn new(request: Request) -> Self {
        Self {
            original: request.clone(),
            request,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn original(&self) -> &Request {
        &self.original
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Whether the body, if any, can be replayed for another attempt.
    pub fn is_repeatable(&self) -> bool {
        self.request.entity().map_or(true, |e| e.is_repeatable())
    }

    /// Restore the working headers to the caller's original set.
    pub fn reset_headers(&mut self) {
        *self.request.headers_mut() = self.original.headers().clone();
    }
}
