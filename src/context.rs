//! Per-client execution context

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::{AuthExchange, CredentialsProvider};
use crate::config::RequestConfig;
use crate::connect::UserToken;
use crate::route::HttpHost;

/// State shared by the sequential exchanges of one logical client.
///
/// Holds the request configuration, the host-keyed authentication
/// exchanges, the pooled-connection affinity token and the credentials
/// provider. Single-writer: only the execution loop mutates it, and one
/// context instance must never serve concurrent exchanges.
#[derive(Default)]
pub struct ClientContext {
    request_config: RequestConfig,
    auth_exchanges: HashMap<HttpHost, AuthExchange>,
    user_token: Option<UserToken>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
}

impl ClientContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RequestConfig) -> Self {
        Self {
            request_config: config,
            ..Self::default()
        }
    }

    pub fn request_config(&self) -> &RequestConfig {
        &self.request_config
    }

    pub fn set_request_config(&mut self, config: RequestConfig) {
        self.request_config = config;
    }

    /// The exchange negotiated with `host`, created on first use.
    pub fn auth_exchange_mut(&mut self, host: &HttpHost) -> &mut AuthExchange {
        self.auth_exchanges.entry(host.clone()).or_default()
    }

    pub fn auth_exchange(&self, host: &HttpHost) -> Option<&AuthExchange> {
        self.auth_exchanges.get(host)
    }

    pub fn user_token(&self) -> Option<&UserToken> {
        self.user_token.as_ref()
    }

    pub fn set_user_token(&mut self, token: UserToken) {
        self.user_token = Some(token);
    }

    pub fn credentials_provider(&self) -> Option<Arc<dyn CredentialsProvider>> {
        self.credentials_provider.clone()
    }

    pub fn set_credentials_provider(&mut self, provider: Arc<dyn CredentialsProvider>) {
        self.credentials_provider = Some(provider);
    }
}
