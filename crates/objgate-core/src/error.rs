//! Error types for the object store layer and the gateway.
//!
//! [`StoreError`] is produced by [`crate::store::ObjectStore`] adapters and
//! never leaks SDK-specific types. [`GatewayError`] is the call-level error of
//! the store client, the upload helpers, and the migration engine.
//!
//! # Usage
//!
//! ```
//! use objgate_core::error::{GatewayError, StoreError};
//!
//! let err: GatewayError = StoreError::NoSuchBucket {
//!     bucket: "public".to_owned(),
//! }
//! .into();
//! assert!(err.is_not_found());
//! ```

/// Errors surfaced by an object store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The specified bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The specified key does not exist.
    #[error("The specified key does not exist: {bucket}/{key}")]
    NoSuchKey {
        /// The bucket that was searched.
        bucket: String,
        /// The key that was not found.
        key: String,
    },

    /// The bucket already exists (owned by the caller or by someone else).
    #[error("The bucket already exists: {bucket}")]
    BucketAlreadyExists {
        /// The bucket name.
        bucket: String,
    },

    /// The backend does not implement this operation.
    #[error("The {backend} store does not support {operation}")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// Operation name.
        operation: &'static str,
    },

    /// The store rejected or failed the request.
    #[error("Store request failed: {message}")]
    Backend {
        /// Rendered error from the underlying SDK.
        message: String,
    },

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    /// Build a [`StoreError::Backend`] from any displayable error.
    #[must_use]
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }

    /// Whether this error means the bucket or key is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchBucket { .. } | Self::NoSuchKey { .. })
    }
}

/// Convenience result type for store adapters.
pub type StoreResult<T> = Result<T, StoreError>;

/// Gateway error type.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The migration destination bucket could not be verified or created.
    #[error("Destination bucket {bucket} could not be verified or created: {source}")]
    DestinationBucket {
        /// The destination bucket.
        bucket: String,
        /// The underlying store failure.
        #[source]
        source: StoreError,
    },

    /// An argument provided by the caller is invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// The uploaded file's extension is not accepted.
    #[error("Unsupported file type: {extension:?}")]
    UnsupportedFileType {
        /// The extension that was rejected.
        extension: String,
    },

    /// A local filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path involved.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Build a [`GatewayError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether this error means the bucket or key is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

/// Convenience result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
