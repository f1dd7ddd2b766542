//! Canonical media types.
//!
//! A [`ContentType`] is the base `type/subtype` of a media type with all
//! parameters (`charset`, `q`, ...) stripped. Canonicalization (trimming and
//! lower-casing) happens once at parse time, so equality is plain string
//! equality.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseContentTypeError;

/// A normalized MIME base type such as `application/json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    /// The empty content type, returned by empty sets.
    pub const NONE: ContentType = ContentType::from_static("");
    pub const JSON: ContentType = ContentType::from_static("application/json");
    pub const XML: ContentType = ContentType::from_static("application/xml");
    pub const TEXT_XML: ContentType = ContentType::from_static("text/xml");
    pub const PLAIN_TEXT: ContentType = ContentType::from_static("text/plain");
    pub const HTML: ContentType = ContentType::from_static("text/html");
    pub const DATA: ContentType = ContentType::from_static("application/octet-stream");
    pub const FORM: ContentType = ContentType::from_static("application/x-www-form-urlencoded");
    pub const MULTIPART_FORM: ContentType = ContentType::from_static("multipart/form-data");
    pub const EVENT_STREAM: ContentType = ContentType::from_static("text/event-stream");

    /// Wrap a string that is already canonical (lower-case, no parameters).
    ///
    /// No validation is performed. Use [`ContentType::parse`] for
    /// untrusted input.
    pub const fn from_static(s: &'static str) -> Self {
        ContentType(Cow::Borrowed(s))
    }

    /// Parse a media type, stripping and validating its parameters.
    ///
    /// ```
    /// use render_axum_core::ContentType;
    ///
    /// let ct = ContentType::parse(" Text/HTML; charset=utf-8").unwrap();
    /// assert_eq!(ct, ContentType::HTML);
    /// assert!(ContentType::parse("text/").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, ParseContentTypeError> {
        let (base, params) = match s.find(';') {
            Some(idx) => s.split_at(idx),
            None => (s, ""),
        };

        let media_type = base.trim().to_ascii_lowercase();
        check_media_type(&media_type)?;
        check_params(params)?;

        Ok(ContentType(Cow::Owned(media_type)))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty content type.
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentType {
    type Err = ParseContentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::parse(s)
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// RFC 2045 tspecials.
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

fn is_token_char(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control() && c != ' ' && !TSPECIALS.contains(c)
}

fn consume_token(s: &str) -> (&str, &str) {
    let end = s.find(|c| !is_token_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// `type` or `type/subtype`, nothing else.
fn check_media_type(s: &str) -> Result<(), ParseContentTypeError> {
    let (ty, rest) = consume_token(s);
    if ty.is_empty() {
        return Err(ParseContentTypeError::NoMediaType);
    }
    if rest.is_empty() {
        return Ok(());
    }
    let Some(rest) = rest.strip_prefix('/') else {
        return Err(ParseContentTypeError::ExpectedSlash);
    };
    let (subtype, rest) = consume_token(rest);
    if subtype.is_empty() {
        return Err(ParseContentTypeError::ExpectedSubtype);
    }
    if !rest.is_empty() {
        return Err(ParseContentTypeError::UnexpectedContent);
    }
    Ok(())
}

fn check_params(mut rest: &str) -> Result<(), ParseContentTypeError> {
    let mut seen: Vec<String> = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(());
        }
        match consume_param(rest) {
            Some((key, remaining)) => {
                if seen.contains(&key) {
                    return Err(ParseContentTypeError::InvalidParameter);
                }
                seen.push(key);
                rest = remaining;
            }
            // Trailing semicolons are tolerated.
            None if rest.trim() == ";" => return Ok(()),
            None => return Err(ParseContentTypeError::InvalidParameter),
        }
    }
}

/// Consume `; key = value`, returning the lower-cased key and the remainder.
fn consume_param(s: &str) -> Option<(String, &str)> {
    let rest = s.trim_start().strip_prefix(';')?.trim_start();
    let (key, rest) = consume_token(rest);
    if key.is_empty() {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let rest = consume_value(rest)?;
    Some((key.to_ascii_lowercase(), rest))
}

/// Consume a token or a quoted-string, returning what follows it.
fn consume_value(s: &str) -> Option<&str> {
    let Some(quoted) = s.strip_prefix('"') else {
        let (value, rest) = consume_token(s);
        return (!value.is_empty()).then_some(rest);
    };

    let mut escaped = false;
    for (idx, c) in quoted.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(&quoted[idx + 1..]),
            '\r' | '\n' => return None,
            _ => {}
        }
    }
    // Unterminated quoted-string.
    None
}
