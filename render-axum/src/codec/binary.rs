//! Raw bytes as `application/octet-stream`.

use render_axum_core::{ContentType, ResponseSink};

use super::{apply_status, set_content_type, set_nosniff};
use crate::context::RequestContext;
use crate::error::EncodeError;
use crate::payload::Data;

/// Write bytes, or text as its UTF-8 bytes. Structured values are declined.
pub fn encode(
    sink: &mut dyn ResponseSink,
    ctx: &RequestContext,
    data: &Data,
) -> Result<(), EncodeError> {
    let Some(bytes) = data.as_binary() else {
        return Err(EncodeError::Declined(ContentType::DATA));
    };
    set_content_type(sink, "application/octet-stream");
    set_nosniff(sink);
    apply_status(sink, ctx);
    sink.write(&bytes)?;
    Ok(())
}
