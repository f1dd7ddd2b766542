//! Built-in codecs.
//!
//! Encoders write a [`Data`](crate::Data) value to a [`ResponseSink`]:
//!
//! - [`json`]: `application/json`, the fallback for every negotiation
//! - [`xml`]: `application/xml` and `text/xml`
//! - [`text`]: `text/plain`, plus an unregistered `text/html` encoder
//! - [`binary`]: `application/octet-stream`
//!
//! The event-stream encoder lives in [`stream`](crate::stream). Decoders
//! exist for JSON, XML and URL-encoded forms ([`form`]).
//!
//! Encoders apply the request's [`StatusHint`](crate::StatusHint), if any,
//! when they write the response head.

pub mod binary;
pub mod form;
pub mod json;
pub mod text;
pub mod xml;

use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, StatusCode};
use render_axum_core::ResponseSink;
use std::io;

use crate::context::RequestContext;

pub(crate) fn set_content_type(sink: &mut dyn ResponseSink, value: &'static str) {
    sink.set_header(CONTENT_TYPE, HeaderValue::from_static(value));
}

pub(crate) fn set_nosniff(sink: &mut dyn ResponseSink) {
    sink.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
}

/// Write the request's status hint, if it carries one.
pub(crate) fn apply_status(sink: &mut dyn ResponseSink, ctx: &RequestContext) {
    if let Some(status) = ctx.status() {
        sink.write_status(status);
    }
}

/// Write a plain-text error response: `message` and a trailing newline.
///
/// ```rust
/// use axum::http::StatusCode;
/// use render_axum::{ResponseRecorder, codec::write_error};
///
/// let mut rec = ResponseRecorder::new();
/// write_error(&mut rec, StatusCode::GATEWAY_TIMEOUT, "Server Timeout").unwrap();
/// assert_eq!(rec.status(), StatusCode::GATEWAY_TIMEOUT);
/// assert_eq!(rec.body_str(), "Server Timeout\n");
/// ```
pub fn write_error(
    sink: &mut dyn ResponseSink,
    status: StatusCode,
    message: &str,
) -> io::Result<()> {
    set_content_type(sink, "text/plain; charset=utf-8");
    set_nosniff(sink);
    sink.write_status(status);
    sink.write(message.as_bytes())?;
    sink.write(b"\n")
}

/// Answer `204 No Content` with an empty body.
pub fn no_content(sink: &mut dyn ResponseSink) -> io::Result<()> {
    sink.write_status(StatusCode::NO_CONTENT);
    sink.flush()
}
