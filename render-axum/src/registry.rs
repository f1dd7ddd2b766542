//! The codec registry.
//!
//! A [`Registry`] maps content types to encoders and decoders. It is read on
//! every request and written rarely (usually at startup), so both maps sit
//! behind reader/writer locks and lookups clone the entry out before any
//! codec runs.
//!
//! Most applications use [`Registry::global`]. Tests and embedders that need
//! isolation build their own with [`Registry::new`] or [`Registry::empty`]
//! and hand it to a [`Negotiator`](crate::Negotiator).

use futures::future::BoxFuture;
use parking_lot::RwLock;
use render_axum_core::{ContentType, ContentTypeSet, ResponseSink};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::codec::{binary, form, json, text, xml};
use crate::context::RequestContext;
use crate::error::{DecodeError, EncodeError};
use crate::payload::{Data, ItemStream};
use crate::stream;

type EncodeFn =
    dyn Fn(&mut dyn ResponseSink, &RequestContext, &Data) -> Result<(), EncodeError> + Send + Sync;

type StreamEncodeFn = dyn for<'a> Fn(
        &'a mut dyn ResponseSink,
        &'a RequestContext,
        ItemStream,
    ) -> BoxFuture<'a, Result<(), EncodeError>>
    + Send
    + Sync;

/// Callback a decoder hands its format's deserializer to.
///
/// The negotiator supplies it; it deserializes the caller's target type and
/// stores the result.
pub type Visit<'v> =
    &'v mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), erased_serde::Error>;

type DecodeFn =
    dyn Fn(&[u8], &RequestContext, Visit<'_>) -> Result<(), DecodeError> + Send + Sync;

/// An encoder registered for one content type.
#[derive(Clone)]
pub enum Encoder {
    /// Encodes a single, fully available value.
    Value(Arc<EncodeFn>),
    /// Consumes a live stream, writing as items arrive.
    Stream(Arc<StreamEncodeFn>),
}

impl Encoder {
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(&mut dyn ResponseSink, &RequestContext, &Data) -> Result<(), EncodeError>
            + Send
            + Sync
            + 'static,
    {
        Encoder::Value(Arc::new(f))
    }

    pub fn stream<F>(f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut dyn ResponseSink,
                &'a RequestContext,
                ItemStream,
            ) -> BoxFuture<'a, Result<(), EncodeError>>
            + Send
            + Sync
            + 'static,
    {
        Encoder::Stream(Arc::new(f))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Encoder::Stream(_))
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoder::Value(_) => f.write_str("Encoder::Value(..)"),
            Encoder::Stream(_) => f.write_str("Encoder::Stream(..)"),
        }
    }
}

/// A decoder registered for one content type.
///
/// Decoders consume the whole body; trailing data after the value is an
/// error for formats that can detect it.
#[derive(Clone)]
pub struct Decoder(Arc<DecodeFn>);

impl Decoder {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[u8], &RequestContext, Visit<'_>) -> Result<(), DecodeError>
            + Send
            + Sync
            + 'static,
    {
        Decoder(Arc::new(f))
    }

    pub fn decode(
        &self,
        body: &[u8],
        ctx: &RequestContext,
        visit: Visit<'_>,
    ) -> Result<(), DecodeError> {
        (self.0)(body, ctx, visit)
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Decoder(..)")
    }
}

// ============================================================================
// Registry
// ============================================================================

static GLOBAL: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// Encoders and decoders keyed by content type.
pub struct Registry {
    encoders: RwLock<HashMap<ContentType, Encoder>>,
    decoders: RwLock<HashMap<ContentType, Decoder>>,
}

impl Registry {
    /// A registry with the built-in codecs.
    ///
    /// Encoders: JSON, XML (`application/xml` and `text/xml`), plain text,
    /// binary and event streams. Decoders: JSON, XML and URL-encoded forms.
    pub fn new() -> Self {
        let registry = Self::empty();

        registry.register_encoder(ContentType::JSON, Encoder::value(json::encode));
        registry.register_encoder(ContentType::XML, Encoder::value(xml::encode));
        registry.register_encoder(ContentType::TEXT_XML, Encoder::value(xml::encode_text_xml));
        registry.register_encoder(ContentType::PLAIN_TEXT, Encoder::value(text::plain_text));
        registry.register_encoder(ContentType::DATA, Encoder::value(binary::encode));
        registry.register_encoder(ContentType::EVENT_STREAM, Encoder::stream(stream::encode));

        registry.register_decoder(ContentType::JSON, Decoder::new(json::decode));
        registry.register_decoder(ContentType::XML, Decoder::new(xml::decode));
        registry.register_decoder(ContentType::TEXT_XML, Decoder::new(xml::decode));
        registry.register_decoder(ContentType::FORM, Decoder::new(form::decode));

        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            encoders: RwLock::new(HashMap::new()),
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry, created with the built-ins on first use.
    pub fn global() -> Arc<Registry> {
        GLOBAL.clone()
    }

    /// Register, replace or (with `None`) remove the encoder for a type.
    ///
    /// ```rust
    /// use render_axum::{ContentType, Encoder, Registry, codec};
    ///
    /// let registry = Registry::empty();
    /// registry.register_encoder(ContentType::HTML, Encoder::value(codec::text::html));
    /// assert!(registry.encoder(&ContentType::HTML).is_some());
    ///
    /// registry.register_encoder(ContentType::HTML, None);
    /// assert!(registry.encoder(&ContentType::HTML).is_none());
    /// ```
    pub fn register_encoder(&self, content_type: ContentType, encoder: impl Into<Option<Encoder>>) {
        let mut encoders = self.encoders.write();
        match encoder.into() {
            Some(encoder) => {
                encoders.insert(content_type, encoder);
            }
            None => {
                encoders.remove(&content_type);
            }
        }
    }

    /// Register, replace or (with `None`) remove the decoder for a type.
    pub fn register_decoder(&self, content_type: ContentType, decoder: impl Into<Option<Decoder>>) {
        let mut decoders = self.decoders.write();
        match decoder.into() {
            Some(decoder) => {
                decoders.insert(content_type, decoder);
            }
            None => {
                decoders.remove(&content_type);
            }
        }
    }

    pub fn encoder(&self, content_type: &ContentType) -> Option<Encoder> {
        self.encoders.read().get(content_type).cloned()
    }

    pub fn decoder(&self, content_type: &ContentType) -> Option<Decoder> {
        self.decoders.read().get(content_type).cloned()
    }

    /// Registered encoder types, sorted.
    pub fn supported_encode_types(&self) -> ContentTypeSet {
        sorted(self.encoders.read().keys())
    }

    /// Registered decoder types, sorted.
    pub fn supported_decode_types(&self) -> ContentTypeSet {
        sorted(self.decoders.read().keys())
    }
}

fn sorted<'a>(types: impl Iterator<Item = &'a ContentType>) -> ContentTypeSet {
    let mut types: Vec<ContentType> = types.cloned().collect();
    types.sort();
    ContentTypeSet::from_types(types)
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("encoders", &self.supported_encode_types().types())
            .field("decoders", &self.supported_decode_types().types())
            .finish()
    }
}
