//! Errors raised while encoding responses and decoding requests.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use render_axum_core::{BoxError, ContentType};
use std::io;

/// Failure reported by an encoder.
///
/// [`EncodeError::Declined`] is not fatal: negotiation moves on to the next
/// acceptable content type. Every other variant ends negotiation.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The encoder cannot represent this kind of value.
    #[error("cannot encode value as {0}")]
    Declined(ContentType),

    /// Serialization or rendering failed.
    #[error("{context}: {source}")]
    Failed {
        context: &'static str,
        #[source]
        source: BoxError,
    },

    /// Writing to the response failed, usually because the client is gone.
    #[error("write response: {0}")]
    Io(#[from] io::Error),
}

impl EncodeError {
    pub(crate) fn failed<E>(context: &'static str, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        EncodeError::Failed {
            context,
            source: err.into(),
        }
    }

    /// Whether the encoder merely declined the value.
    pub fn is_declined(&self) -> bool {
        matches!(self, EncodeError::Declined(_))
    }
}

/// Failure while turning a request body into a value.
///
/// Usable directly as an axum rejection.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No decoder is registered for the request's content type.
    #[error("render: unable to automatically decode the request content type: '{0}'")]
    Unsupported(ContentType),

    /// The body is not valid for the decoder's format.
    #[error("{context}: {source}")]
    Failed {
        context: &'static str,
        #[source]
        source: BoxError,
    },

    /// Reading the request body failed.
    #[error("read request body: {0}")]
    Body(#[source] BoxError),

    /// The body exceeded the configured size limit.
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl DecodeError {
    pub(crate) fn failed<E>(context: &'static str, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        DecodeError::Failed {
            context,
            source: err.into(),
        }
    }

    /// The HTTP status this error maps to when used as a rejection.
    pub fn status(&self) -> StatusCode {
        match self {
            DecodeError::Unsupported(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DecodeError::Failed { .. } | DecodeError::Body(_) => StatusCode::BAD_REQUEST,
            DecodeError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for DecodeError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Failure of a whole respond call.
///
/// By the time one of these is returned, whatever could be written to the
/// client already has been.
#[derive(Debug, thiserror::Error)]
pub enum RespondError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A renderable value's render hook failed.
    #[error("render: {0}")]
    Render(#[source] BoxError),

    /// The request was cancelled or timed out before the stream ended.
    #[error("Server Timeout")]
    Timeout,
}
