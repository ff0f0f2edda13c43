//! HTTP response representation flowing back through the chain

use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, StatusCode, Version};

use crate::connect::ConnectionHolder;
use crate::error::Result;
use crate::http::entity::EntityStream;

/// Response body as observed by the engine.
pub enum ResponseBody {
    /// No body.
    None,
    /// Fully buffered body.
    Buffered(Bytes),
    /// Body still being read from the connection.
    Streaming(Box<dyn EntityStream>),
}

impl ResponseBody {
    pub fn is_streaming(&self) -> bool {
        matches!(self, ResponseBody::Streaming(_))
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, ResponseBody::None)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::None => f.write_str("None"),
            ResponseBody::Buffered(bytes) => {
                f.debug_tuple("Buffered").field(&bytes.len()).finish()
            }
            ResponseBody::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// An HTTP response produced by the transport or synthesized from a
/// cache entry.
///
/// A response with a streaming body may own the connection it is being
/// read from; [`Response::close`] drains the remainder and hands the
/// connection back to its pool.
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: ResponseBody,
    holder: Option<ConnectionHolder>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: ResponseBody::None,
            holder: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = Some(reason.into());
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of `name`, if any.
    pub fn first_header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn set_body(&mut self, body: ResponseBody) {
        self.body = body;
    }

    /// Consume a streaming body fully so the connection can be reused.
    pub fn drain_entity(&mut self) -> Result<()> {
        if let ResponseBody::Streaming(stream) = &mut self.body {
            io::copy(stream, &mut io::sink())?;
            self.body = ResponseBody::None;
        }
        Ok(())
    }

    /// Read a streaming body into memory, detaching it from the
    /// connection.
    pub fn buffer_entity(&mut self) -> Result<()> {
        if let ResponseBody::Streaming(stream) = &mut self.body {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf)?;
            self.body = ResponseBody::Buffered(Bytes::from(buf));
        }
        Ok(())
    }

    pub(crate) fn attach_connection(&mut self, holder: ConnectionHolder) {
        self.holder = Some(holder);
    }

    /// Finish with the response: drain any remaining body and hand the
    /// attached connection back to its pool.
    pub fn close(mut self) -> Result<()> {
        let drained = self.drain_entity();
        if let Some(mut holder) = self.holder.take() {
            match &drained {
                Ok(()) => holder.release_connection(),
                Err(_) => holder.abort_connection(),
            }
        }
        drained
    }
}

impl Drop for Response {
    fn drop(&mut self) {
        // Dropped with the connection still attached means the response was
        // not closed cleanly; the connection state is unknown, discard it.
        if let Some(mut holder) = self.holder.take() {
            holder.abort_connection();
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("version", &self.version)
            .field("headers", &self.headers.len())
            .field("body", &self.body)
            .field("connection", &self.holder.is_some())
            .finish()
    }
}
