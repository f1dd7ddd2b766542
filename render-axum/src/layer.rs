//! Middleware layers.
//!
//! - [`RenderLayer`]: installs a [`Negotiator`](crate::Negotiator) and a
//!   per-request [`Lifetime`](crate::Lifetime) in request extensions.
//! - [`SetContentTypeLayer`]: forces the negotiated content type.
//! - [`AllowedContentTypesLayer`]: rejects request bodies whose content type
//!   is not in an allowed set.
//!
//! ```rust,no_run
//! use axum::{Router, routing::post};
//! use render_axum::{AllowedContentTypesLayer, ContentType, RenderConfig, RenderLayer};
//! use std::time::Duration;
//!
//! # async fn handler() {}
//! let app: Router = Router::new()
//!     .route("/notes", post(handler))
//!     .layer(AllowedContentTypesLayer::new([ContentType::JSON, ContentType::FORM]))
//!     .layer(RenderLayer::with_config(RenderConfig::new().timeout(Duration::from_secs(30))));
//! ```

mod content_type;
mod render;

pub use content_type::{
    AllowedContentTypesLayer, AllowedContentTypesService, SetContentTypeLayer,
    SetContentTypeService,
};
pub use render::{RenderLayer, RenderService};
