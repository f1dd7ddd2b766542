//! The response sink capability.
//!
//! Codecs never build HTTP responses themselves. They write headers, a
//! status and body bytes to a [`ResponseSink`], which the transport
//! integration turns into a real response. [`ResponseRecorder`] is an
//! in-memory sink for tests and for callers that want to inspect output.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::io;

/// Where a codec writes its response.
///
/// The head (status and headers) is committed by the first `write` or
/// `flush`. After that, header changes and further `write_status` calls are
/// ignored. Failed writes are not retried or buffered.
pub trait ResponseSink: Send {
    /// Set (replace) a response header. Ignored once the head is committed.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Set the response status. Only the first call has an effect.
    fn write_status(&mut self, status: StatusCode);

    /// Append body bytes, committing the head with `200 OK` if no status
    /// was written.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Push buffered bytes to the client now.
    ///
    /// Sinks that cannot flush incrementally keep the default no-op.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An in-memory [`ResponseSink`].
///
/// Records the status, the header map as it was when the head was
/// committed, the body and the number of flushes.
///
/// ```
/// use render_axum_core::{ResponseRecorder, ResponseSink};
/// use http::{StatusCode, header};
///
/// let mut rec = ResponseRecorder::new();
/// rec.set_header(header::CONTENT_TYPE, "text/plain".parse().unwrap());
/// rec.write_status(StatusCode::CREATED);
/// rec.write(b"hello").unwrap();
///
/// assert_eq!(rec.status(), StatusCode::CREATED);
/// assert_eq!(rec.header_str(header::CONTENT_TYPE), Some("text/plain"));
/// assert_eq!(rec.body_str(), "hello");
/// ```
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    committed: bool,
    flushes: usize,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn commit(&mut self) {
        if !self.committed {
            self.committed = true;
            self.status.get_or_insert(StatusCode::OK);
        }
    }

    /// The recorded status, `200 OK` if none was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as a string, if present and visible ASCII.
    pub fn header_str(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8, lossily converted.
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether the head has been committed by a write or flush.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// How many times [`ResponseSink::flush`] was called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Take the recorded body, leaving it empty.
    pub fn take_body(&mut self) -> Bytes {
        self.body.split().freeze()
    }
}

impl ResponseSink for ResponseRecorder {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.committed {
            self.headers.insert(name, value);
        }
    }

    fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.commit();
        self.body.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        self.flushes += 1;
        Ok(())
    }
}
