//! Connection lifecycle contract over an external pool
//!
//! Pool internals stay outside the engine; this module defines the
//! lease/release surface the execution loop drives, plus the reuse and
//! keep-alive strategies consulted after each exchange.

pub mod holder;

pub use holder::ConnectionHolder;

use std::any::Any;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, CONNECTION};
use http::{HeaderMap, Version};

use crate::context::ClientContext;
use crate::error::Result;
use crate::http::{Request, Response};
use crate::route::HttpRoute;

/// Opaque affinity token associating pooled connections with a logical
/// user or session.
pub type UserToken = Arc<dyn Any + Send + Sync>;

/// A leased connection as seen by the engine. Transport internals
/// (sockets, TLS) live behind this trait.
pub trait ManagedConnection: Send {
    /// Whether the connection is open and usable.
    fn is_open(&self) -> bool;

    /// Close the connection immediately.
    fn close(&mut self) -> io::Result<()>;

    /// Apply a read timeout for subsequent exchanges.
    fn set_socket_timeout(&mut self, timeout: Option<Duration>);
}

/// A pending connection lease. Cancellation aborts the wait.
pub trait ConnectionRequest: crate::exec::Cancellable {
    /// Wait up to `timeout` for the lease; `None` blocks indefinitely.
    fn get(&self, timeout: Option<Duration>) -> Result<Box<dyn ManagedConnection>>;
}

/// External connection pool contract: lease, route operations, release.
pub trait ConnectionManager: Send + Sync {
    /// Begin leasing a connection suitable for `route`, preferring pooled
    /// connections associated with `state`.
    fn request_connection(
        &self,
        route: &HttpRoute,
        state: Option<UserToken>,
    ) -> Arc<dyn ConnectionRequest>;

    /// Open the next unconnected hop of `route` on `conn`.
    fn connect(
        &self,
        conn: &mut dyn ManagedConnection,
        route: &HttpRoute,
        connect_timeout: Option<Duration>,
        context: &ClientContext,
    ) -> Result<()>;

    /// Layer a protocol (such as TLS) over an established connection.
    fn upgrade(
        &self,
        conn: &mut dyn ManagedConnection,
        route: &HttpRoute,
        context: &ClientContext,
    ) -> Result<()>;

    /// Mark route establishment complete for `conn`.
    fn route_complete(
        &self,
        conn: &mut dyn ManagedConnection,
        route: &HttpRoute,
        context: &ClientContext,
    ) -> Result<()>;

    /// Take back a leased connection. A reusable connection returns to
    /// the pool for `valid_for` (`None` = pool default); anything else is
    /// discarded.
    fn release(
        &self,
        conn: Box<dyn ManagedConnection>,
        state: Option<UserToken>,
        valid_for: Option<Duration>,
        reusable: bool,
    );
}

/// Decides whether a connection can be kept alive after an exchange.
pub trait ConnectionReuseStrategy: Send + Sync {
    fn keep_alive(&self, request: &Request, response: &Response, context: &ClientContext) -> bool;
}

/// Decides how long a reusable connection stays valid.
pub trait KeepAliveStrategy: Send + Sync {
    /// `None` means keep alive indefinitely (pool policy applies).
    fn keep_alive_duration(&self, response: &Response, context: &ClientContext) -> Option<Duration>;
}

/// Default reuse rule: HTTP/1.1 connections persist unless either side
/// sent `Connection: close`; HTTP/1.0 requires an explicit keep-alive
/// token from the server.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultReuseStrategy;

impl ConnectionReuseStrategy for DefaultReuseStrategy {
    fn keep_alive(&self, request: &Request, response: &Response, _context: &ClientContext) -> bool {
        if has_connection_token(request.headers(), &CONNECTION, "close") {
            return false;
        }
        if has_connection_token(response.headers(), &CONNECTION, "close") {
            return false;
        }
        let version = response.version();
        if version == Version::HTTP_10 {
            has_connection_token(response.headers(), &CONNECTION, "keep-alive")
        } else {
            version == Version::HTTP_11
        }
    }
}

/// Default validity window: the `timeout` parameter of the `Keep-Alive`
/// header, or indefinite when absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeepAliveStrategy;

impl KeepAliveStrategy for DefaultKeepAliveStrategy {
    fn keep_alive_duration(
        &self,
        response: &Response,
        _context: &ClientContext,
    ) -> Option<Duration> {
        let keep_alive = HeaderName::from_static("keep-alive");
        for value in response.headers().get_all(&keep_alive) {
            let Ok(text) = value.to_str() else { continue };
            for part in text.split(',') {
                let mut kv = part.trim().splitn(2, '=');
                let name = kv.next().unwrap_or("");
                if name.trim().eq_ignore_ascii_case("timeout") {
                    if let Some(secs) = kv.next().and_then(|v| v.trim().parse::<u64>().ok()) {
                        return Some(Duration::from_secs(secs));
                    }
                }
            }
        }
        None
    }
}

fn has_connection_token(headers: &HeaderMap, name: &HeaderName, token: &str) -> bool {
    headers.get_all(name).iter().any(|value| {
        value
            .to_str()
            .map(|text| {
                text.split(',')
                    .any(|candidate| candidate.trim().eq_ignore_ascii_case(token))
            })
            .unwrap_or(false)
    })
}
