//! Render configuration - process-wide settings.
//!
//! Set once when building a [`Negotiator`](crate::Negotiator), used for
//! every request it handles.

use render_axum_core::ContentType;
use std::time::Duration;

/// Default upper bound for request bodies read by [`Decoded`](crate::Decoded).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for responding and decoding.
///
/// # Example
///
/// ```rust
/// use render_axum::{ContentType, RenderConfig};
/// use std::time::Duration;
///
/// let config = RenderConfig::new()
///     .timeout(Duration::from_secs(30))
///     .max_body_bytes(64 * 1024)
///     .default_request_content_type(ContentType::JSON);
///
/// assert_eq!(config.get_timeout(), Some(Duration::from_secs(30)));
/// assert_eq!(config.get_max_body_bytes(), 64 * 1024);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Request lifetime applied by [`RenderLayer`](crate::RenderLayer).
    timeout: Option<Duration>,
    /// Maximum request body size accepted when decoding.
    max_body_bytes: usize,
    /// Content type assumed for requests without a `Content-Type` header.
    default_request_content_type: Option<ContentType>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            default_request_content_type: None,
        }
    }
}

impl RenderConfig {
    /// Create a config with no timeout, a 2 MiB body limit and no default
    /// request content type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel requests after this long.
    ///
    /// Buffered streams answer `504 Server Timeout`; event streams end with
    /// a timeout frame.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Decode bodies without a `Content-Type` header as this type.
    pub fn default_request_content_type(mut self, content_type: ContentType) -> Self {
        self.default_request_content_type = Some(content_type);
        self
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn get_max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn get_default_request_content_type(&self) -> Option<&ContentType> {
        self.default_request_content_type.as_ref()
    }
}
