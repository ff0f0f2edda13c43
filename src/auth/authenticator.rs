//! Challenge detection and auth header management

use std::collections::HashMap;

use http::HeaderValue;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::route::HttpHost;

use super::{
    AuthChallenge, AuthExchange, AuthState, AuthenticationStrategy, ChallengeType,
    CredentialsProvider,
};

/// Drives per-host authentication exchanges against challenge responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct Authenticator;

enum Advance {
    Continue,
    Failed,
    Reselect,
}

impl Authenticator {
    pub fn new() -> Self {
        Self
    }

    /// Whether `response` challenges this type for `host`.
    ///
    /// Also records the outcome of the previous round on the exchange: an
    /// unchallenged response promotes a pending negotiation to Success,
    /// and a challenge against a Success exchange resets it first.
    pub fn is_challenged(
        &self,
        host: &HttpHost,
        challenge_type: ChallengeType,
        response: &Response,
        exchange: &mut AuthExchange,
    ) -> bool {
        let challenged = response
            .headers()
            .contains_key(challenge_type.challenge_header());
        if challenged {
            if exchange.state() == AuthState::Success {
                debug!(target: "courier::auth", host = %host, "challenged again after success; resetting exchange");
                exchange.reset();
            }
            true
        } else {
            if matches!(exchange.state(), AuthState::Challenged | AuthState::Handshake) {
                debug!(target: "courier::auth", host = %host, "authentication succeeded");
                exchange.set_state(AuthState::Success);
            }
            false
        }
    }

    /// Select or advance a scheme able to answer the challenge. Returns
    /// true only if an authorization value can actually be generated,
    /// which is what makes another round worthwhile.
    pub fn prepare_auth_response(
        &self,
        host: &HttpHost,
        challenge_type: ChallengeType,
        response: &Response,
        strategy: &dyn AuthenticationStrategy,
        exchange: &mut AuthExchange,
        provider: Option<&dyn CredentialsProvider>,
    ) -> bool {
        let challenges = match self.parse_challenges(response, challenge_type) {
            Ok(challenges) => challenges,
            Err(err) => {
                debug!(target: "courier::auth", host = %host, error = %err, "discarding malformed challenge");
                exchange.reset();
                return false;
            }
        };
        if challenges.is_empty() {
            debug!(target: "courier::auth", host = %host, "response carries no usable challenges");
            exchange.reset();
            return false;
        }

        match exchange.state() {
            AuthState::Failure => return false,
            AuthState::Success => exchange.reset(),
            AuthState::Challenged | AuthState::Handshake => {
                let advance = match exchange.scheme_mut() {
                    Some(scheme) => match challenges.get(scheme.name()) {
                        Some(challenge) => {
                            if scheme.process_challenge(challenge).is_err() {
                                Advance::Failed
                            } else if scheme.is_challenge_complete() {
                                // re-challenged after a completed handshake:
                                // the credentials were rejected
                                Advance::Failed
                            } else {
                                Advance::Continue
                            }
                        }
                        None => Advance::Reselect,
                    },
                    None => Advance::Reselect,
                };
                match advance {
                    Advance::Continue => {
                        exchange.set_state(AuthState::Handshake);
                        return true;
                    }
                    Advance::Failed => {
                        debug!(target: "courier::auth", host = %host, "authentication failed");
                        exchange.reset();
                        exchange.set_state(AuthState::Failure);
                        return false;
                    }
                    Advance::Reselect => exchange.reset(),
                }
            }
            AuthState::Unchallenged => {}
        }

        let Some(provider) = provider else {
            debug!(target: "courier::auth", host = %host, "no credentials provider configured");
            return false;
        };
        for mut scheme in strategy.select(challenge_type, &challenges) {
            let Some(challenge) = challenges.get(scheme.name()) else {
                continue;
            };
            if scheme.process_challenge(challenge).is_err() {
                continue;
            }
            match scheme.is_response_ready(host, provider) {
                Ok(true) => {
                    debug!(target: "courier::auth", host = %host, scheme = scheme.name(), "selected authentication scheme");
                    exchange.reset();
                    exchange.select(scheme);
                    exchange.set_state(AuthState::Challenged);
                    return true;
                }
                Ok(false) => {
                    debug!(target: "courier::auth", host = %host, scheme = scheme.name(), "no credentials for scheme");
                }
                Err(err) => {
                    debug!(target: "courier::auth", host = %host, error = %err, "scheme rejected challenge");
                }
            }
        }
        false
    }

    /// Inject the authorization header for this exchange, if one can be
    /// produced. Success-state exchanges authenticate preemptively unless
    /// their scheme is connection-based.
    pub fn add_auth_response(
        &self,
        host: &HttpHost,
        challenge_type: ChallengeType,
        request: &mut Request,
        exchange: &mut AuthExchange,
    ) -> Result<()> {
        let preemptive = exchange.state() == AuthState::Success;
        match exchange.state() {
            AuthState::Failure | AuthState::Unchallenged => Ok(()),
            AuthState::Success | AuthState::Challenged | AuthState::Handshake => {
                let value = {
                    let Some(scheme) = exchange.scheme_mut() else {
                        return Ok(());
                    };
                    if preemptive && scheme.is_connection_based() {
                        // the connection itself is already authenticated
                        return Ok(());
                    }
                    scheme.generate_auth_response(host, &*request)?
                };
                let header_value = HeaderValue::from_str(&value)
                    .map_err(|e| Error::Auth(format!("invalid authorization value: {e}")))?;
                request.set_header(challenge_type.response_header(), header_value);
                Ok(())
            }
        }
    }

    /// Parse the RFC 7235 challenge list for `challenge_type`, keyed by
    /// lowercased scheme token.
    pub fn parse_challenges(
        &self,
        response: &Response,
        challenge_type: ChallengeType,
    ) -> Result<HashMap<String, AuthChallenge>> {
        let mut challenges = HashMap::new();
        for value in response.headers().get_all(challenge_type.challenge_header()) {
            let raw = value.to_str().map_err(|_| {
                Error::MalformedChallenge("challenge header is not valid UTF-8".into())
            })?;
            for challenge in parse_challenge_list(raw)? {
                challenges.insert(challenge.scheme().to_string(), challenge);
            }
        }
        Ok(challenges)
    }
}

/// Split a header value into a list of challenges.
///
/// Commas separate both challenges and parameters; a segment of the form
/// `name=value` continues the current challenge, a bare token starts a
/// new one. token68 blobs are recognized and skipped.
fn parse_challenge_list(input: &str) -> Result<Vec<AuthChallenge>> {
    let mut challenges: Vec<AuthChallenge> = Vec::new();
    for part in split_outside_quotes(input) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match split_param(part) {
            Some((name, value)) => {
                let challenge = challenges.last_mut().ok_or_else(|| {
                    Error::MalformedChallenge(format!("parameter before scheme: {part}"))
                })?;
                challenge.add_param(name, value);
            }
            None => {
                let mut words = part.splitn(2, char::is_whitespace);
                let scheme = words.next().unwrap_or_default();
                if !is_token(scheme) {
                    return Err(Error::MalformedChallenge(format!(
                        "invalid scheme token: {scheme}"
                    )));
                }
                let mut challenge = AuthChallenge::new(scheme);
                if let Some(rest) = words.next() {
                    if let Some((name, value)) = split_param(rest.trim()) {
                        challenge.add_param(name, value);
                    }
                    // anything else is a token68 blob; carries no parameters
                }
                challenges.push(challenge);
            }
        }
    }
    Ok(challenges)
}

fn split_outside_quotes(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// `name=value` when the segment is an auth parameter, `None` when it is
/// a scheme token or token68 blob.
fn split_param(part: &str) -> Option<(&str, String)> {
    let eq = part.find('=')?;
    let name = part[..eq].trim();
    if name.is_empty() || !is_token(name) {
        return None;
    }
    let value = part[eq + 1..].trim();
    if value.starts_with('=') || value.is_empty() {
        // trailing '=' padding marks a token68 blob
        return None;
    }
    Some((name, unquote(value)))
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut escaped = false;
        for c in inner.chars() {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else {
                out.push(c);
            }
        }
        out
    } else {
        value.to_string()
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}
