//! `application/x-www-form-urlencoded` decoding.

use crate::context::RequestContext;
use crate::error::DecodeError;
use crate::registry::Visit;

pub fn decode(body: &[u8], _ctx: &RequestContext, visit: Visit<'_>) -> Result<(), DecodeError> {
    let de = serde_urlencoded::Deserializer::new(form_urlencoded::parse(body));
    let mut erased = <dyn erased_serde::Deserializer>::erase(de);
    let erased: &mut dyn erased_serde::Deserializer<'_> = &mut erased;
    visit(erased).map_err(|err| DecodeError::failed("decode form", err))
}
