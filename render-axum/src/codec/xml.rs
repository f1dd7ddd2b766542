//! XML codec.
//!
//! Structured values are serialized with `quick-xml`, using the type name as
//! the root element. Values with no element of their own (a list or a
//! number) are wrapped in `<item>`, so a list becomes a run of `<item>`
//! elements like a drained stream does. Error entries become
//! `<error>message</error>`.
//!
//! Text, bytes and values that serialize to a bare string are declined so
//! negotiation can move on, as is any value `quick-xml` cannot represent.

use quick_xml::se::{SeError, Serializer};
use render_axum_core::{ContentType, ResponseSink};
use serde::Serialize;

use super::{apply_status, set_content_type};
use crate::context::RequestContext;
use crate::error::{DecodeError, EncodeError};
use crate::payload::Data;
use crate::registry::Visit;

/// The declaration prepended to encoded documents.
pub const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// How far into a body to look for an existing declaration.
const DECLARATION_WINDOW: usize = 100;

/// Prepend [`DECLARATION`] unless `<?xml` already appears in the first
/// 100 bytes of `body`.
pub fn with_declaration(body: String) -> String {
    let head = &body.as_bytes()[..body.len().min(DECLARATION_WINDOW)];
    if head.windows(5).any(|w| w == b"<?xml") {
        body
    } else {
        let mut out = String::with_capacity(DECLARATION.len() + body.len());
        out.push_str(DECLARATION);
        out.push_str(&body);
        out
    }
}

fn write_root<T>(out: &mut String, root: &str, value: &T) -> Result<(), EncodeError>
where
    T: ?Sized + Serialize,
{
    let ser = Serializer::with_root(out, Some(root))
        .map_err(|err| EncodeError::failed("encode xml", err))?;
    value
        .serialize(ser)
        .map_err(|err| EncodeError::failed("encode xml", err))?;
    Ok(())
}

fn write_data(
    out: &mut String,
    data: &Data,
    content_type: &ContentType,
) -> Result<(), EncodeError> {
    if let Some(items) = data.as_sequence() {
        for item in items {
            match item.as_error() {
                Some(message) => write_root(out, "error", message)?,
                None if item.as_sequence().is_some() => write_data(out, item, content_type)?,
                None => write_root(out, "item", item)?,
            }
        }
        return Ok(());
    }
    if let Some(message) = data.as_error() {
        return write_root(out, "error", message);
    }
    if data.is_scalar() || data.is_bare_string() {
        return Err(EncodeError::Declined(content_type.clone()));
    }

    let xml = match quick_xml::se::to_string(data) {
        Err(SeError::Unsupported(_)) => quick_xml::se::to_string_with_root("item", data),
        result => result,
    };
    match xml {
        Ok(xml) => {
            out.push_str(&xml);
            Ok(())
        }
        Err(SeError::Unsupported(reason)) => {
            tracing::debug!(target: "render_axum", %reason, "value has no xml form");
            Err(EncodeError::Declined(content_type.clone()))
        }
        Err(err) => Err(EncodeError::failed("encode xml", err)),
    }
}

fn encode_as(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
    content_type: ContentType,
) -> Result<(), EncodeError> {
    let mut body = String::new();
    write_data(&mut body, data, &content_type)?;
    let body = with_declaration(body);

    set_content_type(sink, "application/xml; charset=utf-8");
    apply_status(sink, ctx);
    sink.write(body.as_bytes())?;
    Ok(())
}

/// Encode a structured value as `application/xml; charset=utf-8`.
pub fn encode(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
) -> Result<(), EncodeError> {
    encode_as(sink, ctx, data, ContentType::XML)
}

/// The `text/xml` registration. Writes the same document as [`encode`] and
/// declines under `text/xml`.
pub fn encode_text_xml(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
) -> Result<(), EncodeError> {
    encode_as(sink, ctx, data, ContentType::TEXT_XML)
}

/// Decode an XML document. A leading declaration is skipped.
pub fn decode(body: &[u8], _ctx: &RequestContext, visit: Visit<'_>) -> Result<(), DecodeError> {
    let text = std::str::from_utf8(body).map_err(|err| DecodeError::failed("decode xml", err))?;
    let mut de = quick_xml::de::Deserializer::from_str(text);
    let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
    let erased: &mut dyn erased_serde::Deserializer<'_> = &mut erased;
    visit(erased).map_err(|err| DecodeError::failed("decode xml", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use render_axum_core::ResponseRecorder;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Book {
        title: String,
        pages: u32,
    }

    fn book() -> Book {
        Book {
            title: "Dune".into(),
            pages: 412,
        }
    }

    #[test]
    fn test_with_declaration_prepends() {
        assert_eq!(with_declaration("<a/>".into()), format!("{DECLARATION}<a/>"));
    }

    #[test]
    fn test_with_declaration_is_idempotent() {
        let once = with_declaration("<a/>".into());
        assert_eq!(with_declaration(once.clone()), once);

        let commented = "<!-- generated -->\n<?xml version=\"1.0\"?><a/>".to_string();
        assert_eq!(with_declaration(commented.clone()), commented);
    }

    #[test]
    fn test_with_declaration_only_looks_at_prefix() {
        let late = format!("<a>{}</a><?xml", " ".repeat(120));
        assert!(with_declaration(late).starts_with(DECLARATION));
    }

    #[test]
    fn test_encode_struct() {
        let mut rec = ResponseRecorder::new();
        encode(&mut rec, &RequestContext::new(), &Data::value(book())).unwrap();
        assert_eq!(
            rec.header_str(CONTENT_TYPE),
            Some("application/xml; charset=utf-8")
        );
        let body = rec.body_str();
        assert!(body.starts_with(DECLARATION));
        assert_eq!(body.matches("<?xml").count(), 1);
        assert!(body.contains("<Book><title>Dune</title><pages>412</pages></Book>"));
    }

    #[test]
    fn test_encode_sequence() {
        let data = Data::sequence(vec![Data::value(book()), Data::error("late")]);
        let mut rec = ResponseRecorder::new();
        encode(&mut rec, &RequestContext::new(), &data).unwrap();
        let body = rec.body_str();
        assert!(body.contains("<item><title>Dune</title><pages>412</pages></item>"));
        assert!(body.ends_with("<error>late</error>"));
    }

    #[test]
    fn test_encode_declines_text() {
        let mut rec = ResponseRecorder::new();
        let err = encode(&mut rec, &RequestContext::new(), &Data::text("hi")).unwrap_err();
        assert!(err.is_declined());
        assert!(!rec.is_committed());
    }

    #[test]
    fn test_encode_list_value() {
        let mut rec = ResponseRecorder::new();
        encode(&mut rec, &RequestContext::new(), &Data::value(vec![book(), book()])).unwrap();
        let body = rec.body_str();
        assert!(body.starts_with(DECLARATION));
        assert_eq!(
            body.matches("<item><title>Dune</title><pages>412</pages></item>").count(),
            2
        );
    }

    #[test]
    fn test_encode_number_value() {
        let mut rec = ResponseRecorder::new();
        encode(&mut rec, &RequestContext::new(), &Data::value(5)).unwrap();
        assert_eq!(rec.body_str(), format!("{DECLARATION}<item>5</item>"));
    }

    #[test]
    fn test_encode_declines_string_value() {
        let mut rec = ResponseRecorder::new();
        let err = encode(&mut rec, &RequestContext::new(), &Data::value(String::from("hi")))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Declined(ct) if ct == ContentType::XML));
        assert!(!rec.is_committed());
    }

    #[test]
    fn test_encode_declines_unrepresentable_value() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(1, "one");
        let mut rec = ResponseRecorder::new();
        let err = encode(&mut rec, &RequestContext::new(), &Data::value(map)).unwrap_err();
        assert!(err.is_declined());
        assert!(!rec.is_committed());
    }

    #[test]
    fn test_text_xml_declines_under_its_own_type() {
        let mut rec = ResponseRecorder::new();
        let err = encode_text_xml(&mut rec, &RequestContext::new(), &Data::text("hi"))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Declined(ct) if ct == ContentType::TEXT_XML));

        encode_text_xml(&mut rec, &RequestContext::new(), &Data::value(book())).unwrap();
        assert_eq!(
            rec.header_str(CONTENT_TYPE),
            Some("application/xml; charset=utf-8")
        );
    }

    #[test]
    fn test_round_trip() {
        let mut rec = ResponseRecorder::new();
        encode(&mut rec, &RequestContext::new(), &Data::value(book())).unwrap();

        let mut out = None;
        decode(
            rec.body(),
            &RequestContext::new(),
            &mut |de: &mut dyn erased_serde::Deserializer<'_>| {
                out = Some(erased_serde::deserialize::<Book>(de)?);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(out, Some(book()));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode(&[0xff, 0xfe], &RequestContext::new(), &mut |_: &mut dyn erased_serde::Deserializer<'_>| Ok(())).unwrap_err();
        assert!(matches!(err, DecodeError::Failed { context: "decode xml", .. }));
    }
}
