//! Process-wide bucket existence cache.
//!
//! A monotonic memoization table: once a bucket is known to exist it stays
//! cached for the lifetime of the cache. Entries are never evicted, so a
//! bucket deleted out-of-band is not noticed until the process restarts.

use dashmap::DashMap;

/// Concurrent set of bucket names known to exist.
#[derive(Debug, Default)]
pub struct BucketCache {
    known: DashMap<String, bool>,
}

impl BucketCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `bucket` has been recorded as existing.
    #[must_use]
    pub fn contains(&self, bucket: &str) -> bool {
        self.known.get(bucket).is_some_and(|v| *v)
    }

    /// Record that `bucket` exists. Returns `true` if this call inserted it.
    pub fn mark_exists(&self, bucket: &str) -> bool {
        self.known.insert(bucket.to_owned(), true).is_none()
    }

    /// Number of cached buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
