//! Synchronous transient-failure retry stage

use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use crate::context::ClientContext;
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::route::HttpRoute;

use super::{ClientExecChain, ExecutionAware};

/// Decides whether a failed request may be resubmitted.
///
/// `exec_count` is the number of the attempt that just failed, starting
/// at 1. Capping the number of retries is this policy's responsibility;
/// the retry stages themselves do not count.
pub trait RetryPolicy: Send + Sync {
    fn retry_request(
        &self,
        request: &Request,
        cause: &Error,
        exec_count: u32,
        context: &ClientContext,
    ) -> bool;
}

/// Stock policy: transport failures of idempotent requests, up to a
/// bounded number of attempts.
#[derive(Debug, Clone)]
pub struct DefaultRetryPolicy {
    max_retries: u32,
}

impl Default for DefaultRetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl DefaultRetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    fn idempotent(method: &Method) -> bool {
        *method == Method::GET
            || *method == Method::HEAD
            || *method == Method::PUT
            || *method == Method::DELETE
            || *method == Method::OPTIONS
            || *method == Method::TRACE
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn retry_request(
        &self,
        request: &Request,
        cause: &Error,
        exec_count: u32,
        _context: &ClientContext,
    ) -> bool {
        if exec_count > self.max_retries {
            return false;
        }
        if !cause.is_transport() {
            return false;
        }
        Self::idempotent(request.method())
    }
}

/// Retry stage of the synchronous chain.
///
/// Recovers transport failures by resubmitting the request through the
/// next stage when the policy allows it; every other failure propagates
/// unchanged. A non-repeatable entity blocks retry unconditionally.
pub struct RetryExec {
    next: Arc<dyn ClientExecChain>,
    policy: Arc<dyn RetryPolicy>,
}

impl RetryExec {
    pub fn new(next: Arc<dyn ClientExecChain>, policy: Arc<dyn RetryPolicy>) -> Self {
        Self { next, policy }
    }
}

impl ClientExecChain for RetryExec {
    fn execute(
        &self,
        route: &HttpRoute,
        request: Request,
        context: &mut ClientContext,
        aware: Option<&dyn ExecutionAware>,
    ) -> Result<Response> {
        let mut exec_count = 1u32;
        loop {
            let attempt = request.clone();
            match self.next.execute(route, attempt, context, aware) {
                Ok(response) => return Ok(response),
                Err(cause) if cause.is_transport() => {
                    if let Some(aware) = aware {
                        if aware.is_aborted() {
                            return Err(Error::Aborted);
                        }
                    }
                    if let Some(entity) = request.entity() {
                        if !entity.is_repeatable() {
                            debug!(target: "courier::retry", "cannot retry request with a non-repeatable entity");
                            return Err(cause);
                        }
                    }
                    if !self.policy.retry_request(&request, &cause, exec_count, context) {
                        return Err(cause);
                    }
                    // the failed attempt's connection was already aborted
                    // by the terminal stage; the next one leases afresh
                    info!(
                        target: "courier::retry",
                        attempt = exec_count,
                        error = %cause,
                        route = %route,
                        "recoverable I/O error; resubmitting request"
                    );
                    if let Some(entity) = request.entity() {
                        entity.release_resources();
                    }
                    exec_count += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}
