//! # render-axum
//!
//! Content negotiation for [Axum](https://github.com/tokio-rs/axum) handlers.
//!
//! A handler wraps its result in a [`Payload`] and hands it to a
//! [`Responder`]. The response is encoded in the first format the client's
//! `Accept` header asks for that can represent the value, falling back to
//! JSON. Request bodies are decoded the same way with [`Decoded<T>`].
//!
//! ## Features
//!
//! - **Negotiated encoding:** JSON, XML, plain text and raw bytes out of the
//!   box. Encoders that cannot represent a value decline it and the next
//!   accepted type is tried.
//! - **Live streams:** a [`Payload::Stream`] goes out as server-sent events
//!   when the client accepts `text/event-stream`, and is otherwise collected
//!   and encoded as a list.
//! - **Pluggable codecs:** encoders and decoders live in a [`Registry`] keyed
//!   by [`ContentType`]. The process-wide registry can be changed at runtime.
//! - **Middleware:** [`RenderLayer`] installs the negotiator and a request
//!   timeout; [`SetContentTypeLayer`] and [`AllowedContentTypesLayer`] pin or
//!   restrict content types per route.
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, response::Response};
//! use render_axum::prelude::*;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Book {
//!     title: String,
//! }
//!
//! async fn book(responder: Responder) -> Response {
//!     responder.respond(Payload::value(Book { title: "Dune".into() })).await
//! }
//!
//! let app: Router = Router::new()
//!     .route("/book", get(book))
//!     .layer(RenderLayer::default());
//! ```

pub mod codec;
pub mod context;
pub mod error;
pub mod layer;
pub mod negotiate;
pub mod payload;
pub mod registry;
pub mod request;
pub mod response;
pub mod stream;

pub use render_axum_core::*;

pub use context::{
    ContentTypeOverride, DEFAULT_MAX_BODY_BYTES, Lifetime, RenderConfig, RequestContext,
    StatusHint, set_status,
};
pub use error::{DecodeError, EncodeError, RespondError};
pub use layer::{AllowedContentTypesLayer, RenderLayer, SetContentTypeLayer};
pub use negotiate::Negotiator;
pub use payload::{Data, Item, ItemStream, Payload, Render};
pub use registry::{Decoder, Encoder, Registry};
pub use request::{Decoded, Responder};
pub use response::{BodyWriter, PendingResponse};

// Re-export several crates
pub use erased_serde;
pub use futures;
pub use serde;

pub mod prelude {
    //! A prelude for `render-axum` providing the most common types.
    pub use crate::context::{RenderConfig, RequestContext};
    pub use crate::layer::{AllowedContentTypesLayer, RenderLayer, SetContentTypeLayer};
    pub use crate::payload::{Data, Item, Payload, Render};
    pub use crate::request::{Decoded, Responder};
    pub use render_axum_core::{ContentType, ContentTypeSet};
}

/// Render `payload` for a request with the default [`Negotiator`].
///
/// Uses the global [`Registry`] and ignores any [`RenderLayer`] settings;
/// prefer [`Responder`] inside handlers.
pub async fn respond(ctx: RequestContext, payload: Payload) -> axum::response::Response {
    Negotiator::default().render(ctx, payload).await
}
