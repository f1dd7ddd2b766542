//! Error types shared by the render crates.

/// Boxed error used where codecs and renderers surface arbitrary failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned when a string is not a valid media type.
///
/// Parse failures are never fatal during negotiation: sets built from
/// `Accept` headers silently drop entries that fail to parse.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseContentTypeError {
    /// The input is empty or does not start with a token.
    #[error("no media type")]
    NoMediaType,

    /// The type token is followed by something other than `/`.
    #[error("expected slash after first token")]
    ExpectedSlash,

    /// Nothing follows the `/`.
    #[error("expected token after slash")]
    ExpectedSubtype,

    /// Garbage after the subtype.
    #[error("unexpected content after media subtype")]
    UnexpectedContent,

    /// A `;key=value` parameter is malformed or repeated.
    #[error("invalid media parameter")]
    InvalidParameter,
}
