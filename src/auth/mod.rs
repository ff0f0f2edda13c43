//! Challenge/response authentication
//!
//! Per-host negotiation state lives in [`AuthExchange`] instances keyed by
//! host inside the client context. Schemes are pluggable behind
//! [`AuthScheme`]; only `Basic` ships here.

pub mod authenticator;
pub mod basic;
pub mod exchange;

pub use authenticator::Authenticator;
pub use basic::{BasicCharset, BasicScheme};
pub use exchange::{AuthExchange, AuthState};

use std::collections::HashMap;
use std::fmt;

use http::header::{HeaderName, AUTHORIZATION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, WWW_AUTHENTICATE};

use crate::error::Result;
use crate::http::Request;
use crate::route::HttpHost;

/// Which party issued a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeType {
    Target,
    Proxy,
}

impl ChallengeType {
    /// Response header carrying challenges of this type.
    pub fn challenge_header(self) -> HeaderName {
        match self {
            ChallengeType::Target => WWW_AUTHENTICATE,
            ChallengeType::Proxy => PROXY_AUTHENTICATE,
        }
    }

    /// Request header answering challenges of this type.
    pub fn response_header(self) -> HeaderName {
        match self {
            ChallengeType::Target => AUTHORIZATION,
            ChallengeType::Proxy => PROXY_AUTHORIZATION,
        }
    }
}

/// Username/password pair handed out by a credentials provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Lookup key for credentials: host plus optional realm and scheme name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthScope {
    pub host: HttpHost,
    pub realm: Option<String>,
    pub scheme: Option<String>,
}

impl AuthScope {
    pub fn new(host: HttpHost) -> Self {
        Self {
            host,
            realm: None,
            scheme: None,
        }
    }
}

/// Source of credentials, implemented by the application.
pub trait CredentialsProvider: Send + Sync {
    fn credentials(&self, scope: &AuthScope) -> Option<Credentials>;
}

/// One parsed challenge: scheme token plus parameters with lowercased
/// keys.
#[derive(Debug, Clone, Default)]
pub struct AuthChallenge {
    scheme: String,
    params: Vec<(String, String)>,
}

impl AuthChallenge {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Scheme token, lowercased.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Value of `name`, matched case-insensitively.
    pub fn param(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Append a parameter; the key is lowercased.
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params
            .push((name.into().to_ascii_lowercase(), value.into()));
    }
}

/// A pluggable authentication scheme.
///
/// Holds transient credentials only while producing a response.
pub trait AuthScheme: Send {
    /// Scheme token in lowercase, e.g. `basic`.
    fn name(&self) -> &str;

    /// Whether negotiated state binds to the connection rather than the
    /// host. Connection-based exchanges are reset when the connection is
    /// discarded; the execution loop enforces this, not the scheme.
    fn is_connection_based(&self) -> bool;

    /// Realm announced by the last processed challenge.
    fn realm(&self) -> Option<&str>;

    /// Ingest a challenge, replacing any prior parameters.
    fn process_challenge(&mut self, challenge: &AuthChallenge) -> Result<()>;

    /// Whether the challenge handshake needs no further rounds.
    fn is_challenge_complete(&self) -> bool;

    /// Whether an authorization value can be generated with available
    /// credentials. Caches credentials on success; clears them otherwise.
    fn is_response_ready(
        &mut self,
        host: &HttpHost,
        provider: &dyn CredentialsProvider,
    ) -> Result<bool>;

    /// Produce the authorization header value.
    fn generate_auth_response(&mut self, host: &HttpHost, request: &Request) -> Result<String>;
}

/// Orders candidate schemes for a set of offered challenges.
pub trait AuthenticationStrategy: Send + Sync {
    /// Candidate schemes in preference order.
    fn select(
        &self,
        challenge_type: ChallengeType,
        challenges: &HashMap<String, AuthChallenge>,
    ) -> Vec<Box<dyn AuthScheme>>;
}

/// Default strategy: `Basic` when offered.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAuthenticationStrategy;

impl AuthenticationStrategy for DefaultAuthenticationStrategy {
    fn select(
        &self,
        _challenge_type: ChallengeType,
        challenges: &HashMap<String, AuthChallenge>,
    ) -> Vec<Box<dyn AuthScheme>> {
        let mut schemes: Vec<Box<dyn AuthScheme>> = Vec::new();
        if challenges.contains_key("basic") {
            schemes.push(Box::new(BasicScheme::default()));
        }
        schemes
    }
}
