//! JSON codec.
//!
//! Output matches a browser-safe JSON encoder: `<`, `>`, `&`, U+2028 and
//! U+2029 inside strings are written as `\uXXXX` escapes, and the body ends
//! with a newline.
//!
//! Numbers go through `serde_json` without its `float_roundtrip` feature, so
//! a non-integer `f64` may come back from a decode differing in its last
//! bit. Integers and strings round-trip exactly.

use render_axum_core::ResponseSink;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io;

use super::{apply_status, set_content_type, set_nosniff};
use crate::context::RequestContext;
use crate::error::{DecodeError, EncodeError};
use crate::payload::Data;
use crate::registry::Visit;

/// Compact formatter that escapes HTML-significant characters in strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..idx].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = idx + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serialize `value` with [`HtmlSafeFormatter`].
pub fn to_vec<T>(value: &T) -> serde_json::Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut buf = Vec::with_capacity(128);
    let mut ser = Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Encode any value as `application/json; charset=utf-8`.
pub fn encode(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
) -> Result<(), EncodeError> {
    let mut body = to_vec(data).map_err(|err| EncodeError::failed("encode json", err))?;
    body.push(b'\n');

    set_content_type(sink, "application/json; charset=utf-8");
    set_nosniff(sink);
    apply_status(sink, ctx);
    sink.write(&body)?;
    Ok(())
}

/// Decode a JSON body. Trailing non-whitespace is an error.
pub fn decode(body: &[u8], _ctx: &RequestContext, visit: Visit<'_>) -> Result<(), DecodeError> {
    let mut de = serde_json::Deserializer::from_slice(body);
    {
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        let erased: &mut dyn erased_serde::Deserializer<'_> = &mut erased;
        visit(erased).map_err(|err| DecodeError::failed("decode json", err))?;
    }
    de.end()
        .map_err(|err| DecodeError::failed("decode json", err))
}
