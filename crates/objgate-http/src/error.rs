//! HTTP-level errors and their status codes.

use http::StatusCode;
use objgate_core::error::{GatewayError, StoreError};

/// An error that ends a request with a JSON `{"error": ...}` body.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Malformed or missing request input.
    #[error("{0}")]
    BadRequest(String),

    /// No route, bucket, or object matched.
    #[error("{0}")]
    NotFound(String),

    /// The route exists but not for this method.
    #[error("Method {method} is not allowed on {path}")]
    MethodNotAllowed {
        /// Request method.
        method: http::Method,
        /// Request path.
        path: String,
    },

    /// The uploaded content is of a rejected type.
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// The request body exceeded the configured limit.
    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The selected store backend cannot perform the operation.
    #[error("{0}")]
    NotImplemented(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl HttpError {
    /// Build a [`HttpError::BadRequest`].
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for HttpError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::InvalidArgument { .. } => Self::BadRequest(message),
            GatewayError::UnsupportedFileType { .. } => Self::UnsupportedMediaType(message),
            GatewayError::Store(StoreError::NoSuchBucket { .. } | StoreError::NoSuchKey { .. }) => {
                Self::NotFound(message)
            }
            GatewayError::Store(StoreError::Unsupported { .. }) => Self::NotImplemented(message),
            GatewayError::Store(_)
            | GatewayError::DestinationBucket { .. }
            | GatewayError::Io { .. }
            | GatewayError::Internal(_) => Self::Internal(message),
        }
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        GatewayError::from(err).into()
    }
}
