//! Content negotiation.
//!
//! [`Negotiator::respond`] picks an encoder for a [`Payload`] from the
//! request's accepted types and writes it to a sink:
//!
//! 1. A [`Payload::Render`] runs its render hook first. A failure answers 500.
//! 2. A [`Payload::Stream`] goes straight to the event-stream encoder when the
//!    client accepts `text/event-stream`. Otherwise it is drained into a
//!    sequence; cancellation while draining answers 504.
//! 3. Accepted types are tried in the client's order. An encoder that
//!    declines passes the value on to the next type; any other failure
//!    answers 500.
//! 4. When nothing matches, the value is encoded as JSON.

use axum::response::Response;
use http::StatusCode;
use render_axum_core::{ContentType, ResponseSink};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::{self, json};
use crate::context::{RenderConfig, RequestContext};
use crate::error::{DecodeError, EncodeError, RespondError};
use crate::payload::{Data, Payload};
use crate::registry::{Encoder, Registry};
use crate::response::BodyWriter;
use crate::stream;

/// Responds to and decodes requests using a [`Registry`].
///
/// Cheap to clone. [`Negotiator::default`] uses [`Registry::global`] and a
/// default [`RenderConfig`].
#[derive(Clone, Debug)]
pub struct Negotiator {
    registry: Arc<Registry>,
    config: RenderConfig,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new(Registry::global(), RenderConfig::default())
    }
}

impl Negotiator {
    pub fn new(registry: Arc<Registry>, config: RenderConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Write `payload` to `sink` in the best format the client accepts.
    ///
    /// Exactly one response is written. Errors are returned after the
    /// matching error response has been written (or, for write failures,
    /// could not be).
    pub async fn respond(
        &self,
        sink: &mut dyn ResponseSink,
        ctx: &RequestContext,
        payload: Payload,
    ) -> Result<(), RespondError> {
        let data = match payload {
            Payload::Data(data) => data,
            Payload::Render(mut value) => {
                if let Err(err) = value.render(sink, ctx) {
                    warn!(target: "render_axum", error = %err, "render hook failed");
                    codec::write_error(sink, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
                        .map_err(EncodeError::from)?;
                    return Err(RespondError::Render(err));
                }
                Data::rendered(value)
            }
            Payload::Stream(items) => {
                if ctx.accepted_types().has(&ContentType::EVENT_STREAM)
                    && let Some(Encoder::Stream(encode)) =
                        self.registry.encoder(&ContentType::EVENT_STREAM)
                {
                    return match encode(&mut *sink, ctx, items).await {
                        Ok(()) => Ok(()),
                        Err(err) => fail(sink, &ContentType::EVENT_STREAM, err),
                    };
                }
                Data::sequence(stream::collect(&mut *sink, ctx, items).await?)
            }
        };
        self.encode(sink, ctx, &data)
    }

    /// Encode a fully available value, walking the accepted types.
    pub fn encode(
        &self,
        sink: &mut dyn ResponseSink,
        ctx: &RequestContext,
        data: &Data,
    ) -> Result<(), RespondError> {
        let mut accepted = ctx.accepted_types();
        while accepted.advance() {
            let content_type = accepted.current();
            if *content_type == ContentType::EVENT_STREAM {
                continue;
            }
            let Some(Encoder::Value(encode)) = self.registry.encoder(content_type) else {
                continue;
            };
            match encode(&mut *sink, ctx, data) {
                Ok(()) => return Ok(()),
                Err(EncodeError::Declined(_)) => {
                    debug!(target: "render_axum", %content_type, "encoder declined value");
                }
                Err(err) => return fail(sink, content_type, err),
            }
        }

        let result = match self.registry.encoder(&ContentType::JSON) {
            Some(Encoder::Value(encode)) => encode(&mut *sink, ctx, data),
            _ => json::encode(&mut *sink, ctx, data),
        };
        result.or_else(|err| fail(sink, &ContentType::JSON, err))
    }

    /// Run [`respond`](Self::respond) on a spawned task and return the
    /// response as soon as its head is written.
    ///
    /// The body streams from the task, so event streams reach the client as
    /// frames are produced. Dropping the response or its body cancels the
    /// request's [`Lifetime`](crate::Lifetime).
    pub async fn render(&self, ctx: RequestContext, payload: Payload) -> Response {
        let (mut writer, pending) = BodyWriter::channel();
        let pending = pending.cancel_on_drop(ctx.lifetime().token().clone());
        let negotiator = self.clone();
        tokio::spawn(async move {
            if let Err(err) = negotiator.respond(&mut writer, &ctx, payload).await {
                debug!(target: "render_axum", error = %err, "response ended with an error");
            }
            if let Err(err) = writer.finish() {
                debug!(target: "render_axum", error = %err, "client went away");
            }
        });
        pending.into_response().await
    }

    /// Decode a request body with the decoder for the request's content type.
    ///
    /// A missing or malformed `Content-Type` uses the configured default
    /// request type, if any.
    pub fn decode<T>(&self, ctx: &RequestContext, body: &[u8]) -> Result<T, DecodeError>
    where
        T: DeserializeOwned,
    {
        let default = self
            .config
            .get_default_request_content_type()
            .cloned()
            .unwrap_or(ContentType::NONE);
        let content_type = ctx.request_content_type(&default);
        let Some(decoder) = self.registry.decoder(&content_type) else {
            return Err(DecodeError::Unsupported(content_type));
        };

        let mut slot: Option<T> = None;
        decoder.decode(
            body,
            ctx,
            &mut |de: &mut dyn erased_serde::Deserializer<'_>| {
                slot = Some(erased_serde::deserialize::<T>(de)?);
                Ok(())
            },
        )?;
        slot.ok_or_else(|| DecodeError::failed("decode", "decoder produced no value"))
    }
}

/// Report a terminal encoder failure as a 500, unless the sink itself broke.
fn fail(
    sink: &mut dyn ResponseSink,
    content_type: &ContentType,
    err: EncodeError,
) -> Result<(), RespondError> {
    if let EncodeError::Io(io) = &err {
        debug!(target: "render_axum", %content_type, error = %io, "writing response failed");
    } else {
        warn!(target: "render_axum", %content_type, error = %err, "encoding response failed");
        if let Err(write_err) =
            codec::write_error(sink, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        {
            debug!(target: "render_axum", error = %write_err, "writing error response failed");
        }
    }
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Lifetime;
    use crate::payload::{Item, Render};
    use crate::registry::Decoder;
    use futures::{StreamExt, stream};
    use http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
    use http::{HeaderValue, header};
    use http_body_util::BodyExt;
    use render_axum_core::{BoxError, ResponseRecorder};
    use serde::{Deserialize, Serialize, Serializer};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u32,
        name: String,
    }

    fn user() -> User {
        User {
            id: 1,
            name: "ada".into(),
        }
    }

    fn negotiator() -> Negotiator {
        Negotiator::new(Arc::new(Registry::new()), RenderConfig::new())
    }

    fn accepting(accept: &'static str) -> RequestContext {
        RequestContext::new().with_header(ACCEPT, HeaderValue::from_static(accept))
    }

    async fn respond(negotiator: &Negotiator, ctx: &RequestContext, payload: Payload) -> ResponseRecorder {
        let mut rec = ResponseRecorder::new();
        let _ = negotiator.respond(&mut rec, ctx, payload).await;
        rec
    }

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("broken value"))
        }
    }

    #[derive(Serialize)]
    struct Cached {
        id: u32,
        #[serde(skip)]
        fail: bool,
    }

    impl Render for Cached {
        fn render(&mut self, sink: &mut dyn ResponseSink, _: &RequestContext) -> Result<(), BoxError> {
            if self.fail {
                return Err("not cacheable".into());
            }
            sink.set_header(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_defaults_to_json() {
        let rec = respond(&negotiator(), &RequestContext::new(), Payload::value(user())).await;
        assert_eq!(rec.status(), StatusCode::OK);
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("application/json; charset=utf-8"));
        assert_eq!(rec.body_str(), "{\"id\":1,\"name\":\"ada\"}\n");
    }

    #[tokio::test]
    async fn test_unregistered_accept_falls_back_to_json() {
        let rec = respond(&negotiator(), &accepting("application/pdf"), Payload::value(user())).await;
        assert_eq!(rec.status(), StatusCode::OK);
        assert!(rec.header_str(CONTENT_TYPE).unwrap().starts_with("application/json"));
    }

    #[tokio::test]
    async fn test_decline_moves_to_next_type() {
        let ctx = accepting("text/plain, application/json");
        let rec = respond(&negotiator(), &ctx, Payload::value(user())).await;
        assert_eq!(rec.status(), StatusCode::OK);
        assert!(rec.header_str(CONTENT_TYPE).unwrap().starts_with("application/json"));
        assert_eq!(rec.body_str(), "{\"id\":1,\"name\":\"ada\"}\n");
    }

    #[tokio::test]
    async fn test_client_order_wins() {
        let ctx = accepting("text/plain, application/json");
        let rec = respond(&negotiator(), &ctx, Payload::text("hello")).await;
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("text/plain; charset=utf-8"));
        assert_eq!(rec.body_str(), "hello");

        let ctx = accepting("text/xml;q=0.9, application/json");
        let rec = respond(&negotiator(), &ctx, Payload::value(user())).await;
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("application/xml; charset=utf-8"));
        assert!(rec.body_str().contains("<User><id>1</id><name>ada</name></User>"));
    }

    #[tokio::test]
    async fn test_xml_list_and_string_values() {
        let ctx = accepting("application/xml");
        let rec = respond(&negotiator(), &ctx, Payload::value(vec![user(), user()])).await;
        assert_eq!(rec.status(), StatusCode::OK);
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("application/xml; charset=utf-8"));
        assert_eq!(rec.body_str().matches("<item><id>1</id><name>ada</name></item>").count(), 2);

        let ctx = accepting("application/xml, text/plain");
        let rec = respond(&negotiator(), &ctx, Payload::value(String::from("hi"))).await;
        assert_eq!(rec.status(), StatusCode::OK);
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("text/plain; charset=utf-8"));
        assert_eq!(rec.body_str(), "hi");

        let ctx = accepting("application/xml");
        let rec = respond(&negotiator(), &ctx, Payload::value(5)).await;
        assert_eq!(rec.status(), StatusCode::OK);
        assert!(rec.body_str().ends_with("<item>5</item>"));
    }

    #[tokio::test]
    async fn test_override_beats_accept() {
        let ctx = accepting("application/json").with_content_type(ContentType::PLAIN_TEXT);
        let rec = respond(&negotiator(), &ctx, Payload::text("forced")).await;
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_status_hint() {
        let ctx = RequestContext::new().with_status(StatusCode::CREATED);
        let rec = respond(&negotiator(), &ctx, Payload::value(user())).await;
        assert_eq!(rec.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_encode_failure_is_500() {
        let mut rec = ResponseRecorder::new();
        let err = negotiator()
            .respond(&mut rec, &RequestContext::new(), Payload::value(Broken))
            .await
            .unwrap_err();
        assert!(matches!(err, RespondError::Encode(EncodeError::Failed { .. })));
        assert_eq!(rec.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rec.body_str(), "encode json: broken value\n");
    }

    #[tokio::test]
    async fn test_encode_failure_on_closed_response_keeps_encode_error() {
        let (mut writer, pending) = BodyWriter::channel();
        drop(pending);
        let err = negotiator()
            .respond(&mut writer, &RequestContext::new(), Payload::value(Broken))
            .await
            .unwrap_err();
        assert!(matches!(err, RespondError::Encode(EncodeError::Failed { .. })));
    }

    #[tokio::test]
    async fn test_render_hook_runs_before_encoding() {
        let rec = respond(
            &negotiator(),
            &RequestContext::new(),
            Payload::render(Cached { id: 9, fail: false }),
        )
        .await;
        assert_eq!(rec.header_str(CACHE_CONTROL), Some("max-age=60"));
        assert_eq!(rec.body_str(), "{\"id\":9}\n");
    }

    #[tokio::test]
    async fn test_render_hook_failure_is_500() {
        let mut rec = ResponseRecorder::new();
        let err = negotiator()
            .respond(
                &mut rec,
                &RequestContext::new(),
                Payload::render(Cached { id: 9, fail: true }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RespondError::Render(_)));
        assert_eq!(rec.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rec.body_str(), "not cacheable\n");
    }

    #[tokio::test]
    async fn test_stream_as_event_stream() {
        let ctx = accepting("text/event-stream");
        let payload = Payload::values(stream::iter([1, 2, 3]));
        let rec = respond(&negotiator(), &ctx, payload).await;
        assert_eq!(
            rec.header_str(CONTENT_TYPE),
            Some("text/event-stream; charset=utf-8")
        );
        assert_eq!(
            rec.body_str(),
            "event: data\ndata: 1\n\nevent: data\ndata: 2\n\nevent: data\ndata: 3\n\nevent: EOF\n\n"
        );
    }

    #[tokio::test]
    async fn test_stream_buffered_without_event_stream() {
        let payload = Payload::values(stream::iter([1, 2, 3]));
        let rec = respond(&negotiator(), &accepting("application/json"), payload).await;
        assert_eq!(rec.body_str(), "[1,2,3]\n");
    }

    #[tokio::test]
    async fn test_stream_buffered_when_event_stream_unregistered() {
        let registry = Registry::new();
        registry.register_encoder(ContentType::EVENT_STREAM, None);
        let negotiator = Negotiator::new(Arc::new(registry), RenderConfig::new());

        let ctx = accepting("text/event-stream, application/json");
        let rec = respond(&negotiator, &ctx, Payload::values(stream::iter(["a", "b"]))).await;
        assert_eq!(rec.body_str(), "[\"a\",\"b\"]\n");
    }

    #[tokio::test]
    async fn test_buffered_stream_cancellation_is_504() {
        let lifetime = Lifetime::new();
        lifetime.cancel();
        let ctx = RequestContext::new().with_lifetime(lifetime);
        let mut rec = ResponseRecorder::new();
        let err = negotiator()
            .respond(&mut rec, &ctx, Payload::stream(stream::pending::<Item>()))
            .await
            .unwrap_err();
        assert!(matches!(err, RespondError::Timeout));
        assert_eq!(rec.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(rec.body_str(), "Server Timeout\n");
    }

    #[tokio::test]
    async fn test_empty_registry_still_answers_json() {
        let negotiator = Negotiator::new(Arc::new(Registry::empty()), RenderConfig::new());
        let rec = respond(&negotiator, &accepting("text/plain"), Payload::text("x")).await;
        assert_eq!(rec.body_str(), "\"x\"\n");
    }

    #[tokio::test]
    async fn test_custom_encoder() {
        let registry = Registry::new();
        registry.register_encoder(ContentType::HTML, Encoder::value(codec::text::html));
        let negotiator = Negotiator::new(Arc::new(registry), RenderConfig::new());

        let rec = respond(&negotiator, &accepting("text/html"), Payload::text("<b>hi</b>")).await;
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("text/html; charset=utf-8"));
        assert_eq!(rec.body_str(), "<b>hi</b>");
    }

    #[test]
    fn test_decode_by_content_type() {
        let ctx = RequestContext::new().with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        let decoded: User = negotiator().decode(&ctx, br#"{"id":1,"name":"ada"}"#).unwrap();
        assert_eq!(decoded, user());

        let ctx = RequestContext::new()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
        let decoded: User = negotiator().decode(&ctx, b"id=1&name=ada").unwrap();
        assert_eq!(decoded, user());
    }

    #[test]
    fn test_decode_unsupported() {
        let err = negotiator()
            .decode::<User>(&RequestContext::new(), b"{}")
            .unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(ct) if ct.is_none()));

        let ctx = RequestContext::new()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let err = negotiator().decode::<User>(&ctx, b"{}").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_decode_default_content_type() {
        let negotiator = Negotiator::new(
            Arc::new(Registry::new()),
            RenderConfig::new().default_request_content_type(ContentType::JSON),
        );
        let decoded: User = negotiator
            .decode(&RequestContext::new(), br#"{"id":1,"name":"ada"}"#)
            .unwrap();
        assert_eq!(decoded, user());
    }

    #[test]
    fn test_decode_silent_decoder() {
        let registry = Registry::empty();
        registry.register_decoder(ContentType::JSON, Decoder::new(|_, _, _| Ok(())));
        let negotiator = Negotiator::new(Arc::new(registry), RenderConfig::new());
        let ctx = RequestContext::new()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let err = negotiator.decode::<User>(&ctx, b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_render_returns_response() {
        let response = negotiator()
            .render(RequestContext::new().with_status(StatusCode::ACCEPTED), Payload::value(user()))
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{\"id\":1,\"name\":\"ada\"}\n");
    }

    #[tokio::test]
    async fn test_render_cancels_producer_when_body_dropped() {
        let (tx, rx) = mpsc::channel::<u32>(1);
        let lifetime = Lifetime::new();
        let ctx = accepting("text/event-stream").with_lifetime(lifetime.clone());
        let response = negotiator().render(ctx, Payload::channel(rx)).await;
        drop(response);

        assert!(lifetime.is_cancelled());
        tokio::time::timeout(Duration::from_secs(5), tx.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_render_streams_frames_as_produced() {
        let (tx, rx) = mpsc::channel(1);
        let ctx = accepting("text/event-stream");
        let response = negotiator().render(ctx, Payload::channel(rx)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let mut body = response.into_body().into_data_stream();

        tx.send(1).await.unwrap();
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"event: data\ndata: 1\n\n");

        drop(tx);
        let rest = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(&rest[..], b"event: EOF\n\n");
    }
}
