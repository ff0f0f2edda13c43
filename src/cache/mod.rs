//! Cache consistency: entry model, freshness arithmetic, response
//! synthesis and the chain stage that ties them together
//!
//! Entries are produced and stored by an external cache; this module
//! only reads them, decides whether they can be served, and rebuilds
//! RFC-compliant 200 or 304 responses from them.

pub mod entry;
pub mod exec;
pub mod generator;
pub mod validity;

pub use entry::{CacheEntry, Resource};
pub use exec::{CachingExec, HttpCache};
pub use generator::CachedResponseGenerator;
pub use validity::CacheValidityPolicy;
