//! Mutable record of route establishment progress

use crate::error::{Error, Result};

use super::{HttpHost, HttpRoute, LayerType, TunnelType};

/// Tracks the hops proven so far while one connection is established.
///
/// Owned exclusively by the execution loop for one establishment and
/// discarded once the route is complete.
#[derive(Debug)]
pub struct RouteTracker {
    target: HttpHost,
    connected: bool,
    proxies: Vec<HttpHost>,
    tunnelled: TunnelType,
    layered: LayerType,
    secure: bool,
}

impl RouteTracker {
    pub fn new(target: HttpHost) -> Self {
        Self {
            target,
            connected: false,
            proxies: Vec::new(),
            tunnelled: TunnelType::Plain,
            layered: LayerType::Plain,
            secure: false,
        }
    }

    /// Record a direct connection to the target.
    pub fn connect_target(&mut self, secure: bool) -> Result<()> {
        if self.connected {
            return Err(Error::protocol("already connected"));
        }
        self.connected = true;
        self.secure = secure;
        Ok(())
    }

    /// Record a connection to the first proxy.
    pub fn connect_proxy(&mut self, proxy: HttpHost, secure: bool) -> Result<()> {
        if self.connected {
            return Err(Error::protocol("already connected"));
        }
        self.connected = true;
        self.proxies.push(proxy);
        self.secure = secure;
        Ok(())
    }

    /// Record a tunnel through the proxy chain to the target.
    pub fn tunnel_target(&mut self, secure: bool) -> Result<()> {
        if !self.connected {
            return Err(Error::protocol("no tunnel unless connected"));
        }
        if self.proxies.is_empty() {
            return Err(Error::protocol("no tunnel without a proxy"));
        }
        self.tunnelled = TunnelType::Tunnelled;
        self.secure = secure;
        Ok(())
    }

    /// Record a tunnel to the next proxy in the chain.
    pub fn tunnel_proxy(&mut self, proxy: HttpHost, secure: bool) -> Result<()> {
        if !self.connected {
            return Err(Error::protocol("no tunnel unless connected"));
        }
        if self.proxies.is_empty() {
            return Err(Error::protocol("no proxy tunnel without a proxy"));
        }
        self.proxies.push(proxy);
        self.secure = secure;
        Ok(())
    }

    /// Record a protocol layered over the existing connection.
    pub fn layer_protocol(&mut self, secure: bool) -> Result<()> {
        if !self.connected {
            return Err(Error::protocol("no layered protocol unless connected"));
        }
        self.layered = LayerType::Layered;
        self.secure = secure;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The route proven so far, or `None` before the first connect.
    pub fn to_route(&self) -> Option<HttpRoute> {
        if !self.connected {
            return None;
        }
        Some(HttpRoute::new(
            self.target.clone(),
            self.proxies.clone(),
            self.secure,
            self.tunnelled,
            self.layered,
        ))
    }
}
