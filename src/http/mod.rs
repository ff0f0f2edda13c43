//! HTTP message types consumed and produced by the execution engine
//!
//! The engine never frames messages on the wire; it works with these
//! in-memory representations and leaves serialization to the external
//! transport behind [`crate::exec::RequestExecutor`].

pub mod date;
pub mod entity;
pub mod request;
pub mod response;

pub use entity::{EntityProducer, EntityStream};
pub use request::{Request, RequestWrapper};
pub use response::{Response, ResponseBody};
