//! Migration report types.

use serde::{Deserialize, Serialize};

/// Why an object (or a listing) did not migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Listing a prefix failed part way through.
    ListError,
    /// The destination key already exists and overwrite is disabled.
    ///
    /// This is an intentional skip rather than a fault.
    DestinationExists,
    /// The server-side copy failed. The source is untouched.
    CopyError,
    /// The copy succeeded but removing the source failed. The object now
    /// exists in both buckets.
    RemoveError,
}

impl FailureKind {
    /// Whether this outcome is an expected policy skip rather than an error.
    #[must_use]
    pub fn is_skip(self) -> bool {
        matches!(self, Self::DestinationExists)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ListError => "list error",
            Self::DestinationExists => "destination exists",
            Self::CopyError => "copy error",
            Self::RemoveError => "remove error",
        };
        f.write_str(s)
    }
}

/// One non-successful outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationFailure {
    /// Source key, or the prefix for listing errors.
    pub object_key: String,
    /// Destination key, when one was computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_key: Option<String>,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable cause.
    pub reason: String,
}

impl MigrationFailure {
    pub(crate) fn list_error(prefix: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            object_key: prefix.to_owned(),
            destination_key: None,
            kind: FailureKind::ListError,
            reason: format!("listing prefix {prefix:?} failed: {reason}"),
        }
    }

    pub(crate) fn for_key(
        kind: FailureKind,
        src_key: &str,
        dst_key: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            object_key: src_key.to_owned(),
            destination_key: Some(dst_key.to_owned()),
            kind,
            reason: reason.into(),
        }
    }
}

/// Result of one migration call.
///
/// Serialized as `{"successCount": n, "failed": [...], "cancelled": false}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Objects copied (and removed, if requested) without error.
    pub success_count: usize,
    /// Failure entries: listing errors first, then per-key outcomes ordered
    /// by source key.
    pub failed: Vec<MigrationFailure>,
    /// The migration was cancelled before every key was attempted.
    #[serde(default)]
    pub cancelled: bool,
}

impl MigrationReport {
    /// Whether every candidate migrated and nothing was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    /// Failures of the given kind.
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &MigrationFailure> {
        self.failed.iter().filter(move |f| f.kind == kind)
    }

    /// Number of entries that are real errors rather than policy skips.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.failed.iter().filter(|f| !f.kind.is_skip()).count()
    }
}
