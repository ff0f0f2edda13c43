//! The layered execution chain
//!
//! Execution is an ordered list of stages, each implementing one fixed
//! capability (retry, caching, the terminal exchange) and explicitly
//! forwarding to the next. A stage may short-circuit with its own
//! response, resubmit the request downstream, or transform the outcome
//! on the way back up.

pub mod async_chain;
pub mod async_retry;
pub mod main;
pub mod retry;

pub use async_chain::{
    AsyncExecCallback, AsyncExecChain, AsyncExecChainHandler, AsyncExecRuntime, AsyncExecScope,
};
pub use async_retry::AsyncRetryExec;
pub use main::MainClientExec;
pub use retry::{DefaultRetryPolicy, RetryExec, RetryPolicy};

use crate::connect::{ManagedConnection, UserToken};
use crate::context::ClientContext;
use crate::error::Result;
use crate::http::{Request, Response};
use crate::route::HttpRoute;

/// A cancellable in-flight operation.
pub trait Cancellable: Send + Sync {
    /// Attempt to cancel; returns false when already completed.
    fn cancel(&self) -> bool;
}

/// Caller-side view of a running exchange: an abort flag observed at
/// checkpoints, plus a slot for the operation currently worth
/// cancelling.
pub trait ExecutionAware: Send + Sync {
    fn is_aborted(&self) -> bool;

    fn set_cancellable(&self, cancellable: std::sync::Arc<dyn Cancellable>);
}

/// Resolves the affinity token used for pooled-connection routing.
pub trait UserTokenHandler: Send + Sync {
    fn user_token(&self, route: &HttpRoute, context: &ClientContext) -> Option<UserToken>;
}

/// Dispatches a framed request on an open connection and reads the
/// response head. Implemented by the external transport.
pub trait RequestExecutor: Send + Sync {
    fn execute(
        &self,
        request: &Request,
        conn: &mut dyn ManagedConnection,
        context: &ClientContext,
    ) -> Result<Response>;
}

/// One stage of the synchronous execution chain.
pub trait ClientExecChain: Send + Sync {
    fn execute(
        &self,
        route: &HttpRoute,
        request: Request,
        context: &mut ClientContext,
        aware: Option<&dyn ExecutionAware>,
    ) -> Result<Response>;
}
