//! Route model: hosts, planned routes and establishment tracking
//!
//! A [`HttpRoute`] is the immutable plan of how to reach a target: the
//! ordered proxy chain plus security, tunnelling and layering flags.
//! [`RouteTracker`] records what has actually been proven for one
//! connection, and [`RouteDirector`] computes the next step needed to
//! converge the two.

pub mod director;
pub mod tracker;

pub use director::{RouteDirector, RouteStep};
pub use tracker::RouteTracker;

use std::fmt;

/// One addressable host on a route: scheme, hostname and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpHost {
    scheme: String,
    hostname: String,
    port: u16,
}

impl HttpHost {
    pub fn new(scheme: impl Into<String>, hostname: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            hostname: hostname.into().to_ascii_lowercase(),
            port,
        }
    }

    /// An `http` host.
    pub fn http(hostname: impl Into<String>, port: u16) -> Self {
        Self::new("http", hostname, port)
    }

    /// An `https` host.
    pub fn https(hostname: impl Into<String>, port: u16) -> Self {
        Self::new("https", hostname, port)
    }

    /// The host a parsed URL addresses, with scheme-default ports made
    /// explicit. `None` for URLs without a usable host or port.
    pub fn from_url(url: &url::Url) -> Option<Self> {
        let hostname = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(url.scheme(), hostname, port))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form as used in authority-form request targets.
    pub fn to_host_string(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.hostname, self.port)
    }
}

/// Tunnel state of a route or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelType {
    Plain,
    Tunnelled,
}

/// Protocol layering state of a route or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Plain,
    Layered,
}

/// A planned or established route from the client to a target host.
///
/// Immutable once constructed; equality covers all hops and flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpRoute {
    target: HttpHost,
    proxies: Vec<HttpHost>,
    secure: bool,
    tunnelled: TunnelType,
    layered: LayerType,
}

impl HttpRoute {
    pub fn new(
        target: HttpHost,
        proxies: Vec<HttpHost>,
        secure: bool,
        tunnelled: TunnelType,
        layered: LayerType,
    ) -> Self {
        Self {
            target,
            proxies,
            secure,
            tunnelled,
            layered,
        }
    }

    /// A direct route to the target.
    pub fn direct(target: HttpHost, secure: bool) -> Self {
        Self::new(target, Vec::new(), secure, TunnelType::Plain, LayerType::Plain)
    }

    /// A plain (non-tunnelled) route through a single proxy.
    pub fn via_proxy(target: HttpHost, proxy: HttpHost) -> Self {
        Self::new(
            target,
            vec![proxy],
            false,
            TunnelType::Plain,
            LayerType::Plain,
        )
    }

    pub fn target(&self) -> &HttpHost {
        &self.target
    }

    /// The first proxy, if the route has one.
    pub fn proxy_host(&self) -> Option<&HttpHost> {
        self.proxies.first()
    }

    pub fn proxies(&self) -> &[HttpHost] {
        &self.proxies
    }

    /// Number of hops from the client: each proxy plus the target.
    pub fn hop_count(&self) -> usize {
        self.proxies.len() + 1
    }

    /// Host reached after hop `index`; the final hop is the target.
    pub fn hop_target(&self, index: usize) -> Option<&HttpHost> {
        if index < self.proxies.len() {
            self.proxies.get(index)
        } else if index == self.proxies.len() {
            Some(&self.target)
        } else {
            None
        }
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_tunnelled(&self) -> bool {
        self.tunnelled == TunnelType::Tunnelled
    }

    pub fn is_layered(&self) -> bool {
        self.layered == LayerType::Layered
    }
}

impl fmt::Display for HttpRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        if self.is_secure() {
            write!(f, "s")?;
        }
        if self.is_tunnelled() {
            write!(f, "t")?;
        }
        if self.is_layered() {
            write!(f, "l")?;
        }
        write!(f, "}}client")?;
        for proxy in &self.proxies {
            write!(f, " -> {proxy}")?;
        }
        write!(f, " -> {}", self.target)
    }
}
