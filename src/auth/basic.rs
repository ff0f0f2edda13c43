//! Basic authentication scheme (RFC 7617)

use base64::{engine::general_purpose, Engine as _};

use crate::error::{Error, Result};
use crate::http::Request;
use crate::route::HttpHost;

use super::{AuthChallenge, AuthScheme, AuthScope, Credentials, CredentialsProvider};

/// Charset used to encode `username:password`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasicCharset {
    /// US-ASCII; characters outside the range degrade to `?`.
    #[default]
    Ascii,
    /// UTF-8, per the `charset` auth parameter.
    Utf8,
}

/// Single-round `Basic` scheme.
///
/// Credentials are encoded directly into the authorization value; the
/// only handshake state is the parameter set of the last challenge.
pub struct BasicScheme {
    charset: BasicCharset,
    params: Vec<(String, String)>,
    complete: bool,
    username: Option<String>,
    password: Option<String>,
}

impl Default for BasicScheme {
    fn default() -> Self {
        Self::new(BasicCharset::Ascii)
    }
}

impl BasicScheme {
    pub fn new(charset: BasicCharset) -> Self {
        Self {
            charset,
            params: Vec::new(),
            complete: false,
            username: None,
            password: None,
        }
    }

    /// Seed credentials ahead of any challenge, for preemptive use.
    pub fn init_preemptive(&mut self, credentials: &Credentials) {
        self.username = Some(credentials.username().to_string());
        self.password = Some(credentials.password().to_string());
    }

    fn encode(&self, input: &str) -> Vec<u8> {
        match self.charset {
            BasicCharset::Utf8 => input.as_bytes().to_vec(),
            BasicCharset::Ascii => input
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }
}

impl AuthScheme for BasicScheme {
    fn name(&self) -> &str {
        "basic"
    }

    fn is_connection_based(&self) -> bool {
        false
    }

    fn realm(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == "realm")
            .map(|(_, value)| value.as_str())
    }

    fn process_challenge(&mut self, challenge: &AuthChallenge) -> Result<()> {
        self.params.clear();
        self.params.extend(challenge.params().iter().cloned());
        self.complete = true;
        Ok(())
    }

    fn is_challenge_complete(&self) -> bool {
        self.complete
    }

    fn is_response_ready(
        &mut self,
        host: &HttpHost,
        provider: &dyn CredentialsProvider,
    ) -> Result<bool> {
        let scope = AuthScope {
            host: host.clone(),
            realm: self.realm().map(str::to_string),
            scheme: Some(self.name().to_string()),
        };
        match provider.credentials(&scope) {
            Some(credentials) => {
                self.username = Some(credentials.username().to_string());
                self.password = Some(credentials.password().to_string());
                Ok(true)
            }
            None => {
                self.username = None;
                self.password = None;
                Ok(false)
            }
        }
    }

    fn generate_auth_response(&mut self, _host: &HttpHost, _request: &Request) -> Result<String> {
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| Error::Auth("no credentials available for Basic scheme".into()))?;
        let password = self.password.as_deref().unwrap_or("");
        let mut raw = self.encode(username);
        raw.push(b':');
        raw.extend_from_slice(&self.encode(password));
        Ok(format!("Basic {}", general_purpose::STANDARD.encode(raw)))
    }
}
