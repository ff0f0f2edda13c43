//! Request execution configuration

use std::time::Duration;

/// Execution parameters applied per exchange.
///
/// All timeouts are optional; `None` blocks indefinitely (or defers to the
/// transport default where one applies).
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Maximum time to wait for a connection lease from the pool.
    pub connection_request_timeout: Option<Duration>,
    /// Maximum time to wait while opening a connection hop.
    pub connect_timeout: Option<Duration>,
    /// Socket read timeout applied to the leased connection before dispatch.
    pub socket_timeout: Option<Duration>,
    /// Whether challenge/response authentication handling is enabled.
    pub authentication_enabled: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            connection_request_timeout: None,
            connect_timeout: None,
            socket_timeout: None,
            authentication_enabled: true,
        }
    }
}
