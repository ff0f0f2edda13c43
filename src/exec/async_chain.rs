//! Callback-driven asynchronous execution chain
//!
//! Mirrors the synchronous chain as handler stages: `execute` returns as
//! soon as the request has been delegated downstream, and the outcome
//! arrives through the callback, possibly on another thread supplied by
//! the surrounding pipeline.

use std::sync::{Arc, Mutex};

use crate::context::ClientContext;
use crate::error::{Error, Result};
use crate::http::{EntityProducer, Request, Response};
use crate::route::HttpRoute;

/// Receives the outcome of an asynchronous exchange.
pub trait AsyncExecCallback: Send {
    /// The response head (and possibly the start of its entity stream)
    /// arrived.
    fn handle_response(&mut self, response: &Response) -> Result<()>;

    /// The exchange finished cleanly.
    fn completed(&mut self);

    /// The exchange failed.
    fn failed(&mut self, cause: Error);
}

/// Downstream remainder of the chain.
pub trait AsyncExecChain: Send + Sync {
    fn proceed(
        &self,
        request: Request,
        entity: Option<Arc<dyn EntityProducer>>,
        scope: &AsyncExecScope,
        callback: Box<dyn AsyncExecCallback>,
    ) -> Result<()>;
}

/// One stage of the asynchronous chain.
pub trait AsyncExecChainHandler: Send + Sync {
    fn execute(
        &self,
        request: Request,
        entity: Option<Arc<dyn EntityProducer>>,
        scope: &AsyncExecScope,
        chain: Arc<dyn AsyncExecChain>,
        callback: Box<dyn AsyncExecCallback>,
    ) -> Result<()>;
}

/// Connection endpoint controls available to asynchronous stages.
pub trait AsyncExecRuntime: Send + Sync {
    /// Drop the current endpoint so the next attempt leases a fresh
    /// connection.
    fn discard_endpoint(&self);
}

/// Everything a stage needs to know about the exchange it serves.
///
/// Callbacks may fire on pipeline threads, so the context travels behind
/// a mutex here; the synchronous chain keeps plain `&mut` access.
#[derive(Clone)]
pub struct AsyncExecScope {
    pub exchange_id: String,
    pub route: HttpRoute,
    pub context: Arc<Mutex<ClientContext>>,
    pub exec_runtime: Arc<dyn AsyncExecRuntime>,
}

impl AsyncExecScope {
    pub fn new(
        exchange_id: impl Into<String>,
        route: HttpRoute,
        context: Arc<Mutex<ClientContext>>,
        exec_runtime: Arc<dyn AsyncExecRuntime>,
    ) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            route,
            context,
            exec_runtime,
        }
    }
}
