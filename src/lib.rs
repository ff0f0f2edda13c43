//! # courier
//!
//! HTTP client execution engine: the reusable core beneath a client
//! facade. For one logical request it plans and proves the network route
//! (direct or through proxies, tunnelled and protocol-layered as
//! required), leases and manages a pooled connection, answers
//! authentication challenges from target and proxy, retries transient
//! I/O failures, and synthesizes RFC-compliant responses from stored
//! cache entries.
//!
//! Execution is organized as a chain of stages (retry, caching, the
//! terminal exchange), each forwarding to the next and able to
//! short-circuit, resubmit or transform the outcome. The synchronous
//! chain blocks on the caller's thread; an asynchronous mirror drives
//! the same decisions through pipeline callbacks.
//!
//! Raw transport, TLS, DNS and pool internals stay behind traits: this
//! crate decides *what* happens on the wire, never *how* bytes move.

pub mod auth;
pub mod cache;
pub mod config;
pub mod connect;
pub mod context;
pub mod error;
pub mod exec;
pub mod http;
pub mod route;

pub mod prelude;

pub use crate::prelude::*;
