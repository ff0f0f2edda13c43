//! Error taxonomy for the execution engine
//!
//! The retry stages key off [`Error::is_transport`]: transport failures may
//! be recovered by resubmission, everything else propagates unchanged.
//! Authentication exhaustion is deliberately *not* an error; the final
//! challenge response is returned to the caller instead.

use std::io;

use http::StatusCode;

use crate::http::Response;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while executing an HTTP exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level I/O failure. Eligible for retry subject to policy.
    #[error("I/O error while executing request")]
    Io(#[from] io::Error),

    /// The leased connection was shut down while still in use. Treated as
    /// a transport failure for retry purposes.
    #[error("connection has been shut down")]
    ConnectionShutdown,

    /// Protocol violation (unreachable route, malformed CONNECT reply).
    /// Fatal, never retried.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The proxy refused to establish a tunnel. Carries the proxy's
    /// response so the caller can inspect it.
    #[error("CONNECT refused by proxy: {status}")]
    TunnelRefused {
        status: StatusCode,
        response: Box<Response>,
    },

    /// The exchange was aborted by the caller.
    #[error("request aborted")]
    Aborted,

    /// A retry was required but the request entity cannot be replayed.
    #[error("cannot retry request with a non-repeatable request entity")]
    NonRepeatable,

    /// Authentication processing failure.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A challenge header could not be parsed.
    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),
}

impl Error {
    /// Build a protocol violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }

    /// True for transport failures the retry stages may recover from.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::ConnectionShutdown)
    }
}
