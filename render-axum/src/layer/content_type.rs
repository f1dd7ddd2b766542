//! Content-type middleware.
//!
//! [`SetContentTypeLayer`] pins the content type for every request it wraps;
//! negotiation and body decoding both use it instead of the request headers.
//! [`AllowedContentTypesLayer`] answers `406 Not Acceptable` when the
//! request's `Content-Type` header is not one of an allowed set.

use axum::http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use render_axum_core::{ContentType, ContentTypeSet};
use std::sync::Arc;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower_layer::Layer;
use tower_service::Service;

use crate::context::ContentTypeOverride;

// ============================================================================
// SetContentTypeLayer
// ============================================================================

/// Layer that installs a [`ContentTypeOverride`] on every request.
#[derive(Debug, Clone)]
pub struct SetContentTypeLayer {
    content_type: ContentType,
}

impl SetContentTypeLayer {
    pub fn new(content_type: ContentType) -> Self {
        Self { content_type }
    }
}

impl<S> Layer<S> for SetContentTypeLayer {
    type Service = SetContentTypeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SetContentTypeService {
            inner,
            content_type: self.content_type.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetContentTypeService<S> {
    inner: S,
    content_type: ContentType,
}

impl<S, B> Service<Request<B>> for SetContentTypeService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        req.extensions_mut()
            .insert(ContentTypeOverride(self.content_type.clone()));
        self.inner.call(req)
    }
}

// ============================================================================
// AllowedContentTypesLayer
// ============================================================================

/// Layer that rejects requests whose `Content-Type` is not allowed.
///
/// Only the header is checked; a [`ContentTypeOverride`] does not count. A
/// missing or malformed header is [`ContentType::NONE`], so it passes only
/// when `NONE` is in the set.
#[derive(Debug, Clone)]
pub struct AllowedContentTypesLayer {
    allowed: Arc<ContentTypeSet>,
}

impl AllowedContentTypesLayer {
    pub fn new<I>(allowed: I) -> Self
    where
        I: IntoIterator<Item = ContentType>,
    {
        Self::from_set(ContentTypeSet::from_types(allowed))
    }

    pub fn from_set(allowed: ContentTypeSet) -> Self {
        Self {
            allowed: Arc::new(allowed),
        }
    }
}

impl<S> Layer<S> for AllowedContentTypesLayer {
    type Service = AllowedContentTypesService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AllowedContentTypesService {
            inner,
            allowed: self.allowed.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AllowedContentTypesService<S> {
    inner: S,
    allowed: Arc<ContentTypeSet>,
}

impl<S, B> Service<Request<B>> for AllowedContentTypesService<S>
where
    S: Service<Request<B>, Response = Response>,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let content_type = header_content_type(&req);
        if !self.allowed.has(&content_type) {
            tracing::debug!(
                target: "render_axum",
                %content_type,
                "request content type not allowed"
            );
            let response = not_acceptable(&self.allowed);
            return Box::pin(async move { Ok(response) });
        }
        Box::pin(self.inner.call(req))
    }
}

fn header_content_type<B>(req: &Request<B>) -> ContentType {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| ContentType::parse(v).ok())
        .unwrap_or(ContentType::NONE)
}

fn not_acceptable(allowed: &ContentTypeSet) -> Response {
    (
        StatusCode::NOT_ACCEPTABLE,
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        format!("invalid content type: accepted types are:{allowed}\n"),
    )
        .into_response()
}
