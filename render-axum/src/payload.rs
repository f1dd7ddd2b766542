//! Values handed to the negotiator.
//!
//! A handler's return value is classified once, when it is wrapped in a
//! [`Payload`]:
//!
//! - [`Payload::Data`]: a plain value, encoded by whichever codec wins
//!   negotiation.
//! - [`Payload::Render`]: a value implementing [`Render`], which writes to the
//!   sink itself before it is encoded.
//! - [`Payload::Stream`]: a live producer of [`Item`]s, sent as server-sent
//!   events or drained into a sequence.
//!
//! Codecs never probe a value's capabilities at runtime. [`Data`] records
//! what kind of value it holds (structured, text, bytes, ...) and each codec
//! decides from that whether it can encode it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use render_axum_core::{BoxError, ResponseSink};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Cow;
use std::fmt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::context::RequestContext;

type Erased = Box<dyn erased_serde::Serialize + Send + Sync>;

/// A serializable value that writes to the response itself before it is
/// encoded.
///
/// `render` runs before any codec sees the value. It may set headers or a
/// status on the sink, or write body bytes directly. The value is then
/// encoded like any other [`Data`].
///
/// # Example
///
/// ```rust
/// use axum::http::{HeaderValue, header::CACHE_CONTROL};
/// use render_axum::{BoxError, Render, RequestContext, ResponseSink};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Article {
///     id: u64,
///     title: String,
/// }
///
/// impl Render for Article {
///     fn render(&mut self, sink: &mut dyn ResponseSink, _ctx: &RequestContext) -> Result<(), BoxError> {
///         sink.set_header(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
///         Ok(())
///     }
/// }
/// ```
pub trait Render: erased_serde::Serialize + Send + Sync {
    fn render(&mut self, sink: &mut dyn ResponseSink, ctx: &RequestContext)
    -> Result<(), BoxError>;
}

erased_serde::serialize_trait_object!(Render);

// ============================================================================
// Data - a classified value
// ============================================================================

/// A value ready for encoding, tagged with what kind of value it is.
pub struct Data {
    repr: Repr,
}

enum Repr {
    /// Any serializable value.
    Value(Erased),
    /// A serializable value that also has a text form.
    Display { value: Erased, text: String },
    Text(String),
    Binary(Bytes),
    /// A value whose render hook already ran.
    Rendered(Box<dyn Render>),
    /// An error produced by a stream item's render hook.
    Error(String),
    /// The drained contents of a stream.
    Sequence(Vec<Data>),
}

impl Data {
    /// Wrap any serializable value.
    pub fn value<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            repr: Repr::Value(Box::new(value)),
        }
    }

    /// A string, encodable as plain text, HTML, bytes or a JSON string.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            repr: Repr::Text(text.into()),
        }
    }

    /// Raw bytes. Structured formats encode them as base64 strings.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            repr: Repr::Binary(bytes.into()),
        }
    }

    /// A structured value with a text form.
    ///
    /// Structured codecs serialize the value, text codecs write its
    /// `Display` output.
    pub fn display<T>(value: T) -> Self
    where
        T: Serialize + fmt::Display + Send + Sync + 'static,
    {
        let text = value.to_string();
        Self {
            repr: Repr::Display {
                value: Box::new(value),
                text,
            },
        }
    }

    pub(crate) fn rendered(value: Box<dyn Render>) -> Self {
        Self {
            repr: Repr::Rendered(value),
        }
    }

    /// An error entry, serialized as `{"error": message}`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            repr: Repr::Error(message.into()),
        }
    }

    pub fn sequence(items: Vec<Data>) -> Self {
        Self {
            repr: Repr::Sequence(items),
        }
    }

    /// The text form of this value, if it has one.
    ///
    /// Structured values only have a text form when they serialize to a
    /// bare string.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match &self.repr {
            Repr::Text(text) | Repr::Display { text, .. } => Some(Cow::Borrowed(text)),
            Repr::Value(_) | Repr::Rendered(_) => match serde_json::to_value(self) {
                Ok(serde_json::Value::String(s)) => Some(Cow::Owned(s)),
                _ => None,
            },
            Repr::Binary(_) | Repr::Error(_) | Repr::Sequence(_) => None,
        }
    }

    /// The raw byte form of this value: its bytes, or else its text.
    pub fn as_binary(&self) -> Option<Bytes> {
        match &self.repr {
            Repr::Binary(bytes) => Some(bytes.clone()),
            _ => self.as_text().map(|text| Bytes::from(text.into_owned())),
        }
    }

    pub fn as_sequence(&self) -> Option<&[Data]> {
        match &self.repr {
            Repr::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&str> {
        match &self.repr {
            Repr::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Whether this is a bare text or byte value with no structure.
    pub fn is_scalar(&self) -> bool {
        matches!(self.repr, Repr::Text(_) | Repr::Binary(_))
    }

    /// Whether this is a structured value that serializes to a bare string.
    pub(crate) fn is_bare_string(&self) -> bool {
        matches!(self.repr, Repr::Value(_) | Repr::Rendered(_)) && self.as_text().is_some()
    }
}

impl Serialize for Data {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.repr {
            Repr::Value(value) | Repr::Display { value, .. } => value.serialize(serializer),
            Repr::Text(text) => serializer.serialize_str(text),
            Repr::Binary(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Repr::Rendered(value) => value.serialize(serializer),
            Repr::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
            Repr::Sequence(items) => serializer.collect_seq(items),
        }
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Value(_) => f.write_str("Data::Value(..)"),
            Repr::Display { text, .. } => f.debug_tuple("Data::Display").field(text).finish(),
            Repr::Text(text) => f.debug_tuple("Data::Text").field(text).finish(),
            Repr::Binary(bytes) => f.debug_tuple("Data::Binary").field(bytes).finish(),
            Repr::Rendered(_) => f.write_str("Data::Rendered(..)"),
            Repr::Error(message) => f.debug_tuple("Data::Error").field(message).finish(),
            Repr::Sequence(items) => f.debug_tuple("Data::Sequence").field(items).finish(),
        }
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Data::text(text)
    }
}

impl From<&'static str> for Data {
    fn from(text: &'static str) -> Self {
        Data::text(text)
    }
}

impl From<Bytes> for Data {
    fn from(bytes: Bytes) -> Self {
        Data::bytes(bytes)
    }
}

// ============================================================================
// Item / Payload
// ============================================================================

/// One element produced by a stream.
pub enum Item {
    Data(Data),
    /// Rendered when it is reached; a render failure becomes an error entry.
    Render(Box<dyn Render>),
}

impl Item {
    pub fn value<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Item::Data(Data::value(value))
    }

    pub fn render<R>(value: R) -> Self
    where
        R: Render + 'static,
    {
        Item::Render(Box::new(value))
    }
}

impl From<Data> for Item {
    fn from(data: Data) -> Self {
        Item::Data(data)
    }
}

impl From<Box<dyn Render>> for Item {
    fn from(value: Box<dyn Render>) -> Self {
        Item::Render(value)
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Data(data) => f.debug_tuple("Item::Data").field(data).finish(),
            Item::Render(_) => f.write_str("Item::Render(..)"),
        }
    }
}

/// A single-consumer producer of stream items.
pub type ItemStream = BoxStream<'static, Item>;

/// A response value, classified for negotiation.
pub enum Payload {
    Data(Data),
    Render(Box<dyn Render>),
    Stream(ItemStream),
}

impl Payload {
    pub fn value<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Payload::Data(Data::value(value))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Payload::Data(Data::text(text))
    }

    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Payload::Data(Data::bytes(bytes))
    }

    pub fn display<T>(value: T) -> Self
    where
        T: Serialize + fmt::Display + Send + Sync + 'static,
    {
        Payload::Data(Data::display(value))
    }

    pub fn render<R>(value: R) -> Self
    where
        R: Render + 'static,
    {
        Payload::Render(Box::new(value))
    }

    /// A stream of items.
    pub fn stream<S, T>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        T: Into<Item> + Send + 'static,
    {
        Payload::Stream(stream.map(Into::into).boxed())
    }

    /// A stream of plain serializable values.
    pub fn values<S, T>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        T: Serialize + Send + Sync + 'static,
    {
        Payload::Stream(stream.map(Item::value).boxed())
    }

    /// A stream fed by a channel. The stream ends when every sender is
    /// dropped.
    pub fn channel<T>(rx: mpsc::Receiver<T>) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Payload::values(ReceiverStream::new(rx))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Payload::Stream(_))
    }
}

impl From<Data> for Payload {
    fn from(data: Data) -> Self {
        Payload::Data(data)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Data(data) => f.debug_tuple("Payload::Data").field(data).finish(),
            Payload::Render(_) => f.write_str("Payload::Render(..)"),
            Payload::Stream(_) => f.write_str("Payload::Stream(..)"),
        }
    }
}
