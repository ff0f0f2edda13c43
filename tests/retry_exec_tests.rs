use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::{Method, StatusCode};

use courier::prelude::*;

fn io_error() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
}

fn route() -> HttpRoute {
    HttpRoute::direct(HttpHost::http("www.example.com", 80), false)
}

/// Terminal stage stand-in: fails a scripted number of times, then
/// succeeds.
struct FlakyChain {
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    non_transport: bool,
}

impl FlakyChain {
    fn new(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            non_transport: false,
        }
    }

    fn non_transport(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            non_transport: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClientExecChain for FlakyChain {
    fn execute(
        &self,
        _route: &HttpRoute,
        _request: Request,
        _context: &mut ClientContext,
        _aware: Option<&dyn ExecutionAware>,
    ) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            if self.non_transport {
                return Err(Error::protocol("scripted failure"));
            }
            return Err(io_error());
        }
        Ok(Response::new(StatusCode::OK))
    }
}

struct TestEntity {
    repeatable: bool,
    released: AtomicUsize,
}

impl TestEntity {
    fn new(repeatable: bool) -> Self {
        Self {
            repeatable,
            released: AtomicUsize::new(0),
        }
    }
}

impl EntityProducer for TestEntity {
    fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    fn release_resources(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_transport_failure_triggers_exactly_one_resubmission() {
    let chain = Arc::new(FlakyChain::new(1));
    let retry = RetryExec::new(chain.clone(), Arc::new(DefaultRetryPolicy::default()));
    let mut context = ClientContext::new();

    let response = retry
        .execute(&route(), Request::new(Method::GET, "/"), &mut context, None)
        .expect("second attempt succeeds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(chain.calls(), 2);
}

#[test]
fn test_non_repeatable_entity_blocks_retry() {
    let chain = Arc::new(FlakyChain::new(5));
    let retry = RetryExec::new(chain.clone(), Arc::new(DefaultRetryPolicy::default()));
    let mut context = ClientContext::new();

    let entity = Arc::new(TestEntity::new(false));
    let mut request = Request::new(Method::PUT, "/upload");
    request.set_entity(entity.clone());

    let err = retry
        .execute(&route(), request, &mut context, None)
        .expect_err("must propagate");
    // the original transport cause, not a policy decision
    assert!(err.is_transport());
    assert_eq!(chain.calls(), 1);
    assert_eq!(entity.released.load(Ordering::SeqCst), 0);
}

#[test]
fn test_repeatable_entity_is_released_before_resubmission() {
    let chain = Arc::new(FlakyChain::new(1));
    let retry = RetryExec::new(chain.clone(), Arc::new(DefaultRetryPolicy::default()));
    let mut context = ClientContext::new();

    let entity = Arc::new(TestEntity::new(true));
    let mut request = Request::new(Method::PUT, "/upload");
    request.set_entity(entity.clone());

    retry
        .execute(&route(), request, &mut context, None)
        .expect("retry succeeds");
    assert_eq!(chain.calls(), 2);
    assert_eq!(entity.released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_policy_cap_stops_the_loop() {
    let chain = Arc::new(FlakyChain::new(10));
    let retry = RetryExec::new(chain.clone(), Arc::new(DefaultRetryPolicy::new(1)));
    let mut context = ClientContext::new();

    let err = retry
        .execute(&route(), Request::new(Method::GET, "/"), &mut context, None)
        .expect_err("retries exhausted");
    assert!(err.is_transport());
    // attempt 1 fails and is retried once; attempt 2's failure is final
    assert_eq!(chain.calls(), 2);
}

#[test]
fn test_non_transport_failures_propagate_unchanged() {
    let chain = Arc::new(FlakyChain::non_transport(1));
    let retry = RetryExec::new(chain.clone(), Arc::new(DefaultRetryPolicy::default()));
    let mut context = ClientContext::new();

    let err = retry
        .execute(&route(), Request::new(Method::GET, "/"), &mut context, None)
        .expect_err("must propagate");
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(chain.calls(), 1);
}

#[test]
fn test_default_policy_skips_non_idempotent_methods() {
    let chain = Arc::new(FlakyChain::new(1));
    let retry = RetryExec::new(chain.clone(), Arc::new(DefaultRetryPolicy::default()));
    let mut context = ClientContext::new();

    let err = retry
        .execute(&route(), Request::new(Method::POST, "/submit"), &mut context, None)
        .expect_err("POST is not retried");
    assert!(err.is_transport());
    assert_eq!(chain.calls(), 1);
}
