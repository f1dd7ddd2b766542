//! Extractors.
//!
//! - [`Decoded<T>`] reads the request body and decodes it with the decoder
//!   registered for the request's content type.
//! - [`Responder`] captures what is needed to answer the request later:
//!   the [`Negotiator`] installed by [`RenderLayer`](crate::RenderLayer) and
//!   the request's [`RequestContext`].
//!
//! Both work without the layer, falling back to [`Negotiator::default`].
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::response::Response;
use http::request::Parts;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::RequestContext;
use crate::error::DecodeError;
use crate::negotiate::Negotiator;
use crate::payload::Payload;

// Flag to ensure we only log the missing layer warning once per process
static WARNED_MISSING_LAYER: AtomicBool = AtomicBool::new(false);

/// The negotiator installed by `RenderLayer`, or the default one.
fn negotiator_or_default(extensions: &http::Extensions) -> Arc<Negotiator> {
    if let Some(negotiator) = extensions.get::<Arc<Negotiator>>() {
        return negotiator.clone();
    }

    if !WARNED_MISSING_LAYER.swap(true, Ordering::Relaxed) {
        tracing::warn!(
            target: "render_axum",
            "RenderLayer not found. \
             Using the default negotiator and the global registry."
        );
    }
    Arc::new(Negotiator::default())
}

/// A request body decoded according to its `Content-Type`.
///
/// The body is read up to the negotiator's
/// [`max_body_bytes`](crate::RenderConfig::get_max_body_bytes). Rejections
/// are [`DecodeError`]s: 415 for unsupported types, 413 for oversized
/// bodies and 400 for malformed ones.
///
/// ```rust,no_run
/// use render_axum::{Decoded, Payload, Responder};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize, Serialize)]
/// struct Note {
///     text: String,
/// }
///
/// async fn create(responder: Responder, Decoded(note): Decoded<Note>) -> axum::response::Response {
///     responder.respond(Payload::value(note)).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Decoded<T>(pub T);

impl<T> Decoded<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<S, T> FromRequest<S> for Decoded<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = DecodeError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let negotiator = negotiator_or_default(req.extensions());
        let ctx = RequestContext::from_request(&req);
        let limit = negotiator.config().get_max_body_bytes();

        let body = axum::body::to_bytes(req.into_body(), limit)
            .await
            .map_err(|err| {
                let err = err.into_inner();
                if err.is::<http_body_util::LengthLimitError>() {
                    DecodeError::TooLarge { limit }
                } else {
                    DecodeError::Body(err)
                }
            })?;

        negotiator.decode(&ctx, &body).map(Decoded)
    }
}

/// Answers a request by content negotiation.
#[derive(Debug, Clone)]
pub struct Responder {
    negotiator: Arc<Negotiator>,
    ctx: RequestContext,
}

impl Responder {
    pub fn new(negotiator: Arc<Negotiator>, ctx: RequestContext) -> Self {
        Self { negotiator, ctx }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.ctx
    }

    /// Render `payload` in the best format the client accepts.
    pub async fn respond(self, payload: Payload) -> Response {
        self.negotiator.render(self.ctx, payload).await
    }
}

impl<S> FromRequestParts<S> for Responder
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let negotiator = negotiator_or_default(&parts.extensions);
        Ok(Responder::new(negotiator, RequestContext::from_parts(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderConfig;
    use crate::registry::Registry;
    use axum::body::Body;
    use http::header::{ACCEPT, CONTENT_TYPE};
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    fn post(content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/notes")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    fn with_negotiator(mut req: Request, config: RenderConfig) -> Request {
        let negotiator = Negotiator::new(Arc::new(Registry::new()), config);
        req.extensions_mut().insert(Arc::new(negotiator));
        req
    }

    #[tokio::test]
    async fn test_decoded_json() {
        let req = post("application/json", r#"{"text":"hi"}"#);
        let Decoded(note) = Decoded::<Note>::from_request(req, &()).await.unwrap();
        assert_eq!(note.text, "hi");
    }

    #[tokio::test]
    async fn test_decoded_form() {
        let req = post("application/x-www-form-urlencoded", "text=hello+there");
        let note = Decoded::<Note>::from_request(req, &()).await.unwrap().into_inner();
        assert_eq!(note.text, "hello there");
    }

    #[tokio::test]
    async fn test_decoded_unsupported_type() {
        let req = post("text/csv", "text\nhi");
        let err = Decoded::<Note>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_decoded_too_large() {
        let req = with_negotiator(
            post("application/json", r#"{"text":"far too long"}"#),
            RenderConfig::new().max_body_bytes(8),
        );
        let err = Decoded::<Note>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { limit: 8 }));
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_decoded_malformed() {
        let req = post("application/json", r#"{"text":1}"#);
        let err = Decoded::<Note>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_responder_uses_request_headers() {
        let req = Request::builder()
            .uri("/notes")
            .header(ACCEPT, "application/xml")
            .body(Body::empty())
            .unwrap();
        let req = with_negotiator(req, RenderConfig::new());
        let (mut parts, _) = req.into_parts();

        let responder = Responder::from_request_parts(&mut parts, &()).await.unwrap();
        let response = responder
            .respond(Payload::value(Note { text: "hi".into() }))
            .await;
        assert_eq!(response.headers()[CONTENT_TYPE], "application/xml; charset=utf-8");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).ends_with("<Note><text>hi</text></Note>"));
    }

    #[tokio::test]
    async fn test_responder_without_layer() {
        let (mut parts, _) = Request::builder().body(Body::empty()).unwrap().into_parts();
        let mut responder = Responder::from_request_parts(&mut parts, &()).await.unwrap();
        responder.context_mut().set_status(StatusCode::CREATED);

        let response = responder.respond(Payload::value(1)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
