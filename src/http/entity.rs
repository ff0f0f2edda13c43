//! Request and response entity contracts

use std::io::Read;

/// Source of a request body, supplied by the caller.
///
/// The transport consumes it when framing the request; the retry stages
/// consult it to decide whether a failed request can be replayed.
pub trait EntityProducer: Send + Sync {
    /// Whether the body can be produced more than once.
    fn is_repeatable(&self) -> bool;

    /// Release any resources held by the producer (open files, buffers).
    fn release_resources(&self);
}

/// Streaming response body as handed over by the transport.
pub trait EntityStream: Read + Send {}

impl<T: Read + Send> EntityStream for T {}
