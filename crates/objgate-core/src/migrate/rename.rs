//! Destination key rename policies.

use std::sync::Arc;

use serde::Deserialize;

/// Caller-supplied rename callback.
pub type RenameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Maps a source key to its destination key.
///
/// Collisions (two sources renamed to the same destination) are not
/// rejected; the engine serializes writers per destination key instead.
///
/// # Examples
///
/// ```
/// use objgate_core::migrate::RenamePolicy;
///
/// let policy = RenamePolicy::replace_prefix("images/", "new-images/");
/// assert_eq!(policy.apply("images/a.png"), "new-images/a.png");
/// assert_eq!(policy.apply("videos/a.mp4"), "videos/a.mp4");
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenamePolicy {
    /// Destination key equals source key.
    #[default]
    Identity,
    /// Keys starting with `from` get that prefix replaced by `to`.
    ReplacePrefix {
        /// Prefix to match.
        from: String,
        /// Replacement prefix.
        to: String,
    },
    /// Arbitrary callback. Only constructible in code.
    #[serde(skip_deserializing)]
    Custom(RenameFn),
}

impl RenamePolicy {
    /// Shorthand for [`RenamePolicy::ReplacePrefix`].
    #[must_use]
    pub fn replace_prefix(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::ReplacePrefix {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Wrap a callback as [`RenamePolicy::Custom`].
    #[must_use]
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Compute the destination key for `key`.
    #[must_use]
    pub fn apply(&self, key: &str) -> String {
        match self {
            Self::Identity => key.to_owned(),
            Self::ReplacePrefix { from, to } => match key.strip_prefix(from.as_str()) {
                Some(rest) => format!("{to}{rest}"),
                None => key.to_owned(),
            },
            Self::Custom(f) => f(key),
        }
    }
}

impl std::fmt::Debug for RenamePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::ReplacePrefix { from, to } => f
                .debug_struct("ReplacePrefix")
                .field("from", from)
                .field("to", to)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
