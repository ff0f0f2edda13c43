//! Per-host authentication exchange state

use std::fmt;

use super::AuthScheme;

/// Lifecycle of one host's authentication negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No challenge seen yet.
    Unchallenged,
    /// A challenge arrived and a scheme is ready to answer it.
    Challenged,
    /// A multi-round handshake is in progress.
    Handshake,
    /// Negotiation failed; no further attempts until reset.
    Failure,
    /// The last authorized request went through unchallenged.
    Success,
}

/// Mutable negotiation state for one (host, challenge type) pair.
///
/// Lives in the client context across sequential requests on one logical
/// client; mutated only by the execution loop. A Success exchange never
/// becomes Challenged again without an intervening [`AuthExchange::reset`].
pub struct AuthExchange {
    state: AuthState,
    scheme: Option<Box<dyn AuthScheme>>,
}

impl Default for AuthExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthExchange {
    pub fn new() -> Self {
        Self {
            state: AuthState::Unchallenged,
            scheme: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: AuthState) {
        self.state = state;
    }

    pub fn scheme(&self) -> Option<&dyn AuthScheme> {
        self.scheme.as_deref()
    }

    pub(crate) fn scheme_mut(&mut self) -> Option<&mut (dyn AuthScheme + 'static)> {
        self.scheme.as_deref_mut()
    }

    /// Adopt a newly negotiated scheme.
    pub(crate) fn select(&mut self, scheme: Box<dyn AuthScheme>) {
        self.scheme = Some(scheme);
    }

    /// Forget all negotiated state. Required whenever a connection-based
    /// scheme loses its connection.
    pub fn reset(&mut self) {
        self.state = AuthState::Unchallenged;
        self.scheme = None;
    }
}

impl fmt::Debug for AuthExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthExchange")
            .field("state", &self.state)
            .field("scheme", &self.scheme.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}
