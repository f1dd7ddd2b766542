//! Text encoders. Both decline values without a text form.

use render_axum_core::{ContentType, ResponseSink};

use super::{apply_status, set_content_type, set_nosniff};
use crate::context::RequestContext;
use crate::error::EncodeError;
use crate::payload::Data;

fn write_text(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
    content_type: ContentType,
    header: &'static str,
) -> Result<(), EncodeError> {
    let Some(text) = data.as_text() else {
        return Err(EncodeError::Declined(content_type));
    };
    set_content_type(sink, header);
    set_nosniff(sink);
    apply_status(sink, ctx);
    sink.write(text.as_bytes())?;
    Ok(())
}

/// `text/plain; charset=utf-8`.
pub fn plain_text(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
) -> Result<(), EncodeError> {
    write_text(sink, ctx, data, ContentType::PLAIN_TEXT, "text/plain; charset=utf-8")
}

/// `text/html; charset=utf-8`. The text is written as-is.
pub fn html(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
) -> Result<(), EncodeError> {
    write_text(sink, ctx, data, ContentType::HTML, "text/html; charset=utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
    use render_axum_core::ResponseRecorder;

    #[test]
    fn test_plain_text() {
        let mut rec = ResponseRecorder::new();
        plain_text(&mut rec, &RequestContext::new(), &Data::text("hello")).unwrap();
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("text/plain; charset=utf-8"));
        assert_eq!(rec.header_str(X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
        assert_eq!(rec.body_str(), "hello");
    }

    #[test]
    fn test_plain_text_accepts_string_values() {
        let mut rec = ResponseRecorder::new();
        plain_text(&mut rec, &RequestContext::new(), &Data::value(String::from("s"))).unwrap();
        assert_eq!(rec.body_str(), "s");
    }

    #[test]
    fn test_plain_text_declines_structured_values() {
        let mut rec = ResponseRecorder::new();
        let err = plain_text(&mut rec, &RequestContext::new(), &Data::value(vec![1, 2]))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Declined(ct) if ct == ContentType::PLAIN_TEXT));
        assert!(!rec.is_committed());
        assert!(rec.headers().is_empty());
    }

    #[test]
    fn test_html() {
        let mut rec = ResponseRecorder::new();
        html(&mut rec, &RequestContext::new(), &Data::text("<p>hi</p>")).unwrap();
        assert_eq!(rec.header_str(CONTENT_TYPE), Some("text/html; charset=utf-8"));
        assert_eq!(rec.header_str(X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
        assert_eq!(rec.body_str(), "<p>hi</p>");

        let err = html(&mut rec, &RequestContext::new(), &Data::bytes(&b"x"[..])).unwrap_err();
        assert!(err.is_declined());
    }
}
