//! Canonical public types

pub use crate::auth::{
    AuthChallenge, AuthExchange, AuthScheme, AuthScope, AuthState, AuthenticationStrategy,
    Authenticator, BasicCharset, BasicScheme, ChallengeType, Credentials, CredentialsProvider,
    DefaultAuthenticationStrategy,
};
pub use crate::cache::{
    CacheEntry, CacheValidityPolicy, CachedResponseGenerator, CachingExec, HttpCache, Resource,
};
pub use crate::config::RequestConfig;
pub use crate::connect::{
    ConnectionHolder, ConnectionManager, ConnectionRequest, ConnectionReuseStrategy,
    DefaultKeepAliveStrategy, DefaultReuseStrategy, KeepAliveStrategy, ManagedConnection,
    UserToken,
};
pub use crate::context::ClientContext;
pub use crate::error::{Error, Result};
pub use crate::exec::{
    AsyncExecCallback, AsyncExecChain, AsyncExecChainHandler, AsyncExecRuntime, AsyncExecScope,
    AsyncRetryExec, Cancellable, ClientExecChain, DefaultRetryPolicy, ExecutionAware,
    MainClientExec, RequestExecutor, RetryExec, RetryPolicy, UserTokenHandler,
};
pub use crate::http::{EntityProducer, EntityStream, Request, RequestWrapper, Response, ResponseBody};
pub use crate::route::{
    HttpHost, HttpRoute, LayerType, RouteDirector, RouteStep, RouteTracker, TunnelType,
};
