//! Asynchronous transient-failure retry stage

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::http::{EntityProducer, Request, Response};

use super::async_chain::{
    AsyncExecCallback, AsyncExecChain, AsyncExecChainHandler, AsyncExecScope,
};
use super::retry::RetryPolicy;

/// Retry stage for the asynchronous chain.
///
/// Wraps the downstream callback: successful outcomes pass through
/// untouched, transport failures are resubmitted when the policy allows.
/// Resubmission goes through a trampoline queue, so the stack stays flat
/// no matter how many attempts the policy authorizes. Capping remains
/// the policy's responsibility.
pub struct AsyncRetryExec {
    policy: Arc<dyn RetryPolicy>,
}

impl AsyncRetryExec {
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self { policy }
    }
}

impl AsyncExecChainHandler for AsyncRetryExec {
    fn execute(
        &self,
        request: Request,
        entity: Option<Arc<dyn EntityProducer>>,
        scope: &AsyncExecScope,
        chain: Arc<dyn AsyncExecChain>,
        callback: Box<dyn AsyncExecCallback>,
    ) -> Result<()> {
        let session = Arc::new(RetrySession {
            request,
            entity,
            scope: scope.clone(),
            chain,
            policy: self.policy.clone(),
            downstream: Mutex::new(Some(callback)),
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        });
        RetrySession::submit(&session, 1);
        Ok(())
    }
}

/// Shared state of one logical exchange across its attempts.
struct RetrySession {
    request: Request,
    entity: Option<Arc<dyn EntityProducer>>,
    scope: AsyncExecScope,
    chain: Arc<dyn AsyncExecChain>,
    policy: Arc<dyn RetryPolicy>,
    downstream: Mutex<Option<Box<dyn AsyncExecCallback>>>,
    queue: Mutex<VecDeque<u32>>,
    draining: AtomicBool,
}

impl RetrySession {
    /// Enqueue an attempt and drain the queue unless another frame on
    /// this session is already doing so.
    fn submit(session: &Arc<Self>, exec_count: u32) {
        if let Ok(mut queue) = session.queue.lock() {
            queue.push_back(exec_count);
        }
        Self::drain(session);
    }

    fn drain(session: &Arc<Self>) {
        loop {
            if session.draining.swap(true, Ordering::AcqRel) {
                // the active drainer picks the attempt up
                return;
            }
            loop {
                let next = session.queue.lock().ok().and_then(|mut q| q.pop_front());
                let Some(exec_count) = next else { break };
                let attempt = Box::new(AttemptCallback {
                    session: Arc::clone(session),
                    exec_count,
                });
                let outcome = session.chain.proceed(
                    session.request.clone(),
                    session.entity.clone(),
                    &session.scope,
                    attempt,
                );
                if let Err(err) = outcome {
                    Self::forward_failure(session, err);
                }
            }
            session.draining.store(false, Ordering::Release);
            let drained_all = session
                .queue
                .lock()
                .map(|q| q.is_empty())
                .unwrap_or(true);
            if drained_all {
                return;
            }
            // an attempt arrived between the final pop and the flag reset
        }
    }

    fn forward_failure(session: &Arc<Self>, cause: Error) {
        if let Ok(mut downstream) = session.downstream.lock() {
            if let Some(callback) = downstream.as_mut() {
                callback.failed(cause);
            }
        }
    }
}

/// Callback wrapped around the downstream one for a single attempt.
struct AttemptCallback {
    session: Arc<RetrySession>,
    exec_count: u32,
}

impl AsyncExecCallback for AttemptCallback {
    fn handle_response(&mut self, response: &Response) -> Result<()> {
        match self.session.downstream.lock() {
            Ok(mut downstream) => match downstream.as_mut() {
                Some(callback) => callback.handle_response(response),
                None => Ok(()),
            },
            Err(_) => Ok(()),
        }
    }

    fn completed(&mut self) {
        if let Ok(mut downstream) = self.session.downstream.lock() {
            if let Some(callback) = downstream.as_mut() {
                callback.completed();
            }
        }
    }

    fn failed(&mut self, cause: Error) {
        if cause.is_transport() {
            let repeatable = self
                .session
                .entity
                .as_ref()
                .map_or(true, |e| e.is_repeatable());
            if !repeatable {
                debug!(
                    target: "courier::retry",
                    exchange = %self.session.scope.exchange_id,
                    "cannot retry request with a non-repeatable entity"
                );
            } else {
                let authorized = match self.session.scope.context.lock() {
                    Ok(context) => self.session.policy.retry_request(
                        &self.session.request,
                        &cause,
                        self.exec_count,
                        &context,
                    ),
                    Err(_) => false,
                };
                if authorized {
                    info!(
                        target: "courier::retry",
                        exchange = %self.session.scope.exchange_id,
                        attempt = self.exec_count,
                        error = %cause,
                        route = %self.session.scope.route,
                        "recoverable I/O error; resubmitting request"
                    );
                    self.session.scope.exec_runtime.discard_endpoint();
                    if let Some(entity) = &self.session.entity {
                        entity.release_resources();
                    }
                    RetrySession::submit(&self.session, self.exec_count + 1);
                    return;
                }
            }
        }
        RetrySession::forward_failure(&self.session, cause);
    }
}
