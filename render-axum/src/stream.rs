//! Stream adapters.
//!
//! A live [`ItemStream`] is either sent incrementally as server-sent events
//! ([`event_stream`]) or drained into a sequence for a non-streaming codec
//! ([`collect`]). Both race the next item against the request's
//! [`Lifetime`](crate::Lifetime); once the lifetime ends the producer is
//! dropped without being polled again.
//!
//! ## Event stream frames
//!
//! ```text
//! event: data
//! data: {"id":1}
//!
//! event: error
//! data: {"error":"Server Timeout"}
//!
//! event: EOF
//! ```

use futures::StreamExt;
use futures::future::BoxFuture;
use http::header::{CACHE_CONTROL, CONNECTION};
use http::{HeaderValue, StatusCode};
use render_axum_core::ResponseSink;
use tracing::debug;

use crate::codec::{self, json};
use crate::context::RequestContext;
use crate::error::{EncodeError, RespondError};
use crate::payload::{Data, Item, ItemStream};

const TIMEOUT_FRAME: &[u8] = b"event: error\ndata: {\"error\":\"Server Timeout\"}\n\n";
const EOF_FRAME: &[u8] = b"event: EOF\n\n";

/// Run a stream item's render hook, turning a failure into an error entry.
fn resolve(sink: &mut dyn ResponseSink, ctx: &RequestContext, item: Item) -> Data {
    match item {
        Item::Data(data) => data,
        Item::Render(mut value) => match value.render(sink, ctx) {
            Ok(()) => Data::rendered(value),
            Err(err) => Data::error(err.to_string()),
        },
    }
}

/// Build one `data` frame, or an `error` frame if the item fails to encode.
fn frame(data: &Data) -> Vec<u8> {
    match json::to_vec(data) {
        Ok(encoded) => {
            let mut frame = Vec::with_capacity(encoded.len() + 20);
            frame.extend_from_slice(b"event: data\ndata: ");
            frame.extend_from_slice(&encoded);
            frame.extend_from_slice(b"\n\n");
            frame
        }
        Err(err) => {
            let error = json::to_vec(&Data::error(err.to_string()))
                .unwrap_or_else(|_| b"{\"error\":\"encode\"}".to_vec());
            let mut frame = Vec::with_capacity(error.len() + 20);
            frame.extend_from_slice(b"event: error\ndata: ");
            frame.extend_from_slice(&error);
            frame.extend_from_slice(b"\n\n");
            frame
        }
    }
}

fn write_frame(sink: &mut dyn ResponseSink, frame: &[u8]) -> Result<(), EncodeError> {
    sink.write(frame)?;
    sink.flush()?;
    Ok(())
}

/// Send `items` as `text/event-stream`.
///
/// The head is written and flushed before the first item is awaited. An
/// item that fails to encode becomes an `error` frame and the stream goes
/// on. Cancellation writes a timeout frame and ends the stream; exhaustion
/// writes an `EOF` frame. Only write failures are returned as errors.
pub async fn event_stream(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    mut items: ItemStream,
) -> Result<(), EncodeError> {
    codec::set_content_type(sink, "text/event-stream; charset=utf-8");
    sink.set_header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    // Connection-specific headers are illegal in HTTP/2 and later.
    if ctx.allows_keep_alive() {
        sink.set_header(CONNECTION, HeaderValue::from_static("keep-alive"));
    }
    sink.write_status(StatusCode::OK);
    sink.flush()?;

    let lifetime = ctx.lifetime();
    let mut sent = 0usize;
    loop {
        tokio::select! {
            _ = lifetime.cancelled() => {
                debug!(target: "render_axum", sent, "event stream cancelled");
                return write_frame(sink, TIMEOUT_FRAME);
            }
            item = items.next() => match item {
                Some(item) => {
                    let data = resolve(sink, ctx, item);
                    write_frame(sink, &frame(&data))?;
                    sent += 1;
                }
                None => return write_frame(sink, EOF_FRAME),
            }
        }
    }
}

/// [`event_stream`] in the shape the registry stores.
pub fn encode<'a>(
    sink: &'a mut dyn ResponseSink,
    ctx: &'a RequestContext,
    items: ItemStream,
) -> BoxFuture<'a, Result<(), EncodeError>> {
    Box::pin(event_stream(sink, ctx, items))
}

/// Drain `items` into a vector, in order.
///
/// Cancellation writes `504 Server Timeout` to the sink and returns
/// [`RespondError::Timeout`]; nothing more may be written after that.
pub async fn collect(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    mut items: ItemStream,
) -> Result<Vec<Data>, RespondError> {
    let lifetime = ctx.lifetime();
    let mut collected = Vec::new();
    loop {
        tokio::select! {
            _ = lifetime.cancelled() => {
                debug!(target: "render_axum", collected = collected.len(), "buffered stream cancelled");
                codec::write_error(sink, StatusCode::GATEWAY_TIMEOUT, "Server Timeout")
                    .map_err(EncodeError::from)?;
                return Err(RespondError::Timeout);
            }
            item = items.next() => match item {
                Some(item) => collected.push(resolve(sink, ctx, item)),
                None => return Ok(collected),
            }
        }
    }
}
