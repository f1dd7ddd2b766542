//! Request context and per-request types for rendering.
//!
//! This module provides the [`RequestContext`] every codec receives, the
//! request extensions that steer negotiation ([`StatusHint`],
//! [`ContentTypeOverride`], [`Lifetime`]) and the [`RenderConfig`] used by
//! [`RenderLayer`].
//!
//! [`RenderLayer`]: crate::layer::RenderLayer

pub mod config;
pub mod lifetime;

use axum::extract::FromRequestParts;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Version, header};
use http::request::Parts;
use render_axum_core::{ContentType, ContentTypeSet};
use std::convert::Infallible;

pub use config::{DEFAULT_MAX_BODY_BYTES, RenderConfig};
pub use lifetime::Lifetime;

/// Status code the response should be written with.
///
/// Read by whichever codec writes the response head. Without a hint the
/// codec's own default (usually `200 OK`) applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusHint(pub StatusCode);

/// Forces the negotiated content type, ignoring `Accept` and
/// `Content-Type`.
///
/// Installed by [`SetContentTypeLayer`](crate::layer::SetContentTypeLayer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentTypeOverride(pub ContentType);

/// Attach a status hint to a request's extensions.
///
/// ```rust
/// use axum::http::{Request, StatusCode};
/// use render_axum::{RequestContext, set_status};
///
/// let mut req = Request::new(());
/// set_status(req.extensions_mut(), StatusCode::CREATED);
/// assert_eq!(RequestContext::from_request(&req).status(), Some(StatusCode::CREATED));
/// ```
pub fn set_status(extensions: &mut Extensions, status: StatusCode) {
    extensions.insert(StatusHint(status));
}

// ============================================================================
// RequestContext - what codecs see of the request
// ============================================================================

/// The parts of a request that negotiation and codecs read.
///
/// Built from request parts by the axum extractor, or assembled by hand in
/// tests with the `with_*` methods.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    version: Version,
    status: Option<StatusCode>,
    content_type: Option<ContentType>,
    lifetime: Lifetime,
}

impl RequestContext {
    /// An empty context: no headers, HTTP/1.1, no hints, an open lifetime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from request parts and their extensions.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::build(&parts.headers, parts.version, &parts.extensions)
    }

    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self::build(req.headers(), req.version(), req.extensions())
    }

    fn build(headers: &HeaderMap, version: Version, extensions: &Extensions) -> Self {
        Self {
            headers: headers.clone(),
            version,
            status: extensions.get::<StatusHint>().map(|hint| hint.0),
            content_type: extensions
                .get::<ContentTypeOverride>()
                .map(|o| o.0.clone()),
            lifetime: extensions.get::<Lifetime>().cloned().unwrap_or_default(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the status hint for the response.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn content_type_override(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    /// Content types the client accepts, in preference order.
    ///
    /// An override wins over the `Accept` header. Without either, or when
    /// nothing in `Accept` parses, this is `[application/json]`.
    pub fn accepted_types(&self) -> ContentTypeSet {
        if let Some(content_type) = &self.content_type {
            return ContentTypeSet::from_types([content_type.clone()]);
        }

        let accepted = ContentTypeSet::parse_all(
            self.headers
                .get_all(header::ACCEPT)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(',')),
        );
        if accepted.is_empty() {
            ContentTypeSet::from_types([ContentType::JSON])
        } else {
            accepted
        }
    }

    /// The content type of the request body.
    ///
    /// An override wins over the `Content-Type` header; a missing or
    /// malformed header yields `default`.
    pub fn request_content_type(&self, default: &ContentType) -> ContentType {
        if let Some(content_type) = &self.content_type {
            return content_type.clone();
        }
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| ContentType::parse(v).ok())
            .unwrap_or_else(|| default.clone())
    }

    /// Whether `Connection: keep-alive` may be sent on this request's
    /// protocol version.
    pub fn allows_keep_alive(&self) -> bool {
        matches!(self.version, Version::HTTP_10 | Version::HTTP_11)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_parts(parts))
    }
}
