//! Core types for render-axum.
//!
//! This crate provides the transport-agnostic pieces used by the
//! `render-axum` server crate.
//!
//! ## Contents
//!
//! - [`ContentType`]: Canonical media types and media-type parsing
//! - [`ContentTypeSet`]: Ordered, duplicate-free sets of content types with a cursor
//! - [`ParseContentTypeError`]: Media-type parse errors
//! - [`ResponseSink`]: The response sink capability, with [`ResponseRecorder`] as an in-memory implementation

mod content_type;
mod content_type_set;
mod error;
mod sink;

pub use content_type::*;
pub use content_type_set::*;
pub use error::*;
pub use sink::*;
