//! Bridging [`ResponseSink`] to an axum [`Response`].
//!
//! [`BodyWriter`] is the sink half. It holds status and headers until the
//! first write or flush, then hands the head to the [`PendingResponse`] and
//! forwards body bytes over a channel. Bytes are buffered between flushes
//! and pushed once the buffer passes [`CHUNK_SIZE`].
//!
//! The body channel is unbounded: a slow client does not slow the writer.

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body::Frame;
use pin_project_lite::pin_project;
use render_axum_core::ResponseSink;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::{io, mem};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Buffered bytes are sent once they reach this size, flush or not.
pub const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug)]
struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

/// A [`ResponseSink`] that feeds a [`PendingResponse`].
#[derive(Debug)]
pub struct BodyWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    head: Option<oneshot::Sender<Head>>,
    body: mpsc::UnboundedSender<Bytes>,
    buf: BytesMut,
}

/// The response half of a [`BodyWriter`].
#[derive(Debug)]
pub struct PendingResponse {
    head: oneshot::Receiver<Head>,
    body: mpsc::UnboundedReceiver<Bytes>,
    guard: Option<DropGuard>,
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "response body closed")
}

impl BodyWriter {
    pub fn channel() -> (BodyWriter, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::unbounded_channel();
        let writer = BodyWriter {
            status: None,
            headers: HeaderMap::new(),
            head: Some(head_tx),
            body: body_tx,
            buf: BytesMut::new(),
        };
        let pending = PendingResponse {
            head: head_rx,
            body: body_rx,
            guard: None,
        };
        (writer, pending)
    }

    /// Whether the head has been handed over.
    pub fn is_committed(&self) -> bool {
        self.head.is_none()
    }

    fn commit(&mut self) -> io::Result<()> {
        let Some(tx) = self.head.take() else {
            return Ok(());
        };
        let head = Head {
            status: self.status.unwrap_or(StatusCode::OK),
            headers: mem::take(&mut self.headers),
        };
        tx.send(head).map_err(|_| closed())
    }

    fn push(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.body.send(chunk).map_err(|_| closed())
    }

    /// Commit the head if nothing was written and send what is buffered.
    ///
    /// Dropping the writer afterwards ends the body.
    pub fn finish(mut self) -> io::Result<()> {
        self.commit()?;
        self.push()
    }
}

impl ResponseSink for BodyWriter {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.is_committed() {
            self.headers.insert(name, value);
        }
    }

    fn write_status(&mut self, status: StatusCode) {
        if !self.is_committed() && self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.commit()?;
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.push()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()?;
        self.push()
    }
}

impl PendingResponse {
    /// Cancel `token` when the response, or later its body, is dropped.
    ///
    /// Lets the writer's side notice a client that went away.
    pub fn cancel_on_drop(mut self, token: CancellationToken) -> Self {
        self.guard = Some(token.drop_guard());
        self
    }

    /// Wait for the head and build the response.
    ///
    /// If the writer is dropped without committing, the response is a bare
    /// `500 Internal Server Error`.
    pub async fn into_response(self) -> Response {
        let Ok(head) = self.head.await else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        let body = ChannelBody {
            chunks: UnboundedReceiverStream::new(self.body),
            _guard: self.guard,
        };
        let mut response = Response::new(Body::new(body));
        *response.status_mut() = head.status;
        *response.headers_mut() = head.headers;
        response
    }
}

pin_project! {
    /// Response body fed by a [`BodyWriter`]. Ends when the writer is dropped.
    struct ChannelBody {
        #[pin]
        chunks: UnboundedReceiverStream<Bytes>,
        _guard: Option<DropGuard>,
    }
}

impl http_body::Body for ChannelBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.project()
            .chunks
            .poll_next(cx)
            .map(|chunk| chunk.map(|data| Ok(Frame::data(data))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use http::header::CONTENT_TYPE;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_head_and_body() {
        let (mut writer, pending) = BodyWriter::channel();
        writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write_status(StatusCode::CREATED);
        writer.write(b"hello ").unwrap();
        writer.write(b"world").unwrap();
        writer.finish().unwrap();

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(&body_of(response).await[..], b"hello world");
    }

    #[tokio::test]
    async fn test_head_frozen_after_commit() {
        let (mut writer, pending) = BodyWriter::channel();
        writer.write(b"x").unwrap();
        assert!(writer.is_committed());
        writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write_status(StatusCode::NOT_FOUND);
        writer.finish().unwrap();

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_finish_without_writes() {
        let (mut writer, pending) = BodyWriter::channel();
        writer.write_status(StatusCode::NO_CONTENT);
        writer.finish().unwrap();

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_flush_sends_chunks() {
        let (mut writer, pending) = BodyWriter::channel();
        writer.write(b"one").unwrap();
        writer.flush().unwrap();

        let response = pending.into_response().await;
        let mut body = response.into_body().into_data_stream();
        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"one");

        writer.write(b"two").unwrap();
        writer.flush().unwrap();
        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"two");

        drop(writer);
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn test_large_writes_push_without_flush() {
        let (mut writer, pending) = BodyWriter::channel();
        writer.write(&vec![b'a'; CHUNK_SIZE]).unwrap();

        let response = pending.into_response().await;
        let mut body = response.into_body().into_data_stream();
        assert_eq!(body.next().await.unwrap().unwrap().len(), CHUNK_SIZE);
    }

    #[tokio::test]
    async fn test_dropped_writer_is_500() {
        let (writer, pending) = BodyWriter::channel();
        drop(writer);
        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_dropping_body_cancels_token() {
        let token = CancellationToken::new();
        let (mut writer, pending) = BodyWriter::channel();
        writer.flush().unwrap();

        let response = pending.cancel_on_drop(token.clone()).into_response().await;
        assert!(!token.is_cancelled());
        drop(response);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_write_after_response_dropped() {
        let (mut writer, pending) = BodyWriter::channel();
        drop(pending);
        let err = writer.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
