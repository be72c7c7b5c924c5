//! The bucket-to-bucket migration engine.
//!
//! ```text
//!   prefixes ──list──> candidate keys (BTreeSet, dedup)
//!                           |
//!                  group by rename(key)
//!                           |
//!        buffered(concurrency) ── one task per destination key
//!                           |   stat? -> copy -> remove?
//!                           v
//!                 outcomes sorted by source key
//!                           |
//!                           v
//!                    MigrationReport
//! ```

use std::collections::{BTreeMap, BTreeSet};

use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use super::{FailureKind, MigrationFailure, MigrationReport, RenamePolicy};
use crate::error::{GatewayError, GatewayResult};
use crate::store::StoreClient;

/// Default number of destination keys processed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Parameters of one migration call.
///
/// # Examples
///
/// ```
/// use objgate_core::migrate::{MigrationRequest, RenamePolicy};
///
/// let request = MigrationRequest::builder()
///     .source_bucket("public")
///     .destination_bucket("publicv1")
///     .prefixes(vec!["images/".to_owned()])
///     .rename(RenamePolicy::replace_prefix("images/", "new-images/"))
///     .build();
/// assert!(!request.overwrite);
/// ```
#[derive(Debug, Clone, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    /// Bucket to read from.
    #[builder(setter(into))]
    pub source_bucket: String,
    /// Bucket to write to. Created if missing.
    #[builder(setter(into))]
    pub destination_bucket: String,
    /// Key prefixes to migrate. Empty means the whole bucket.
    #[serde(default)]
    #[builder(default)]
    pub prefixes: Vec<String>,
    /// Replace existing destination objects instead of skipping them.
    #[serde(default)]
    #[builder(default)]
    pub overwrite: bool,
    /// Delete each source object after it has been copied.
    #[serde(default)]
    #[builder(default)]
    pub remove_source: bool,
    /// Destination key mapping.
    #[serde(default)]
    #[builder(default)]
    pub rename: RenamePolicy,
}

impl MigrationRequest {
    /// Check that both bucket names are present.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidArgument`] naming the missing field.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.source_bucket.trim().is_empty() {
            return Err(GatewayError::invalid_argument("sourceBucket is required"));
        }
        if self.destination_bucket.trim().is_empty() {
            return Err(GatewayError::invalid_argument("destinationBucket is required"));
        }
        Ok(())
    }

    fn effective_prefixes(&self) -> Vec<&str> {
        if self.prefixes.is_empty() {
            vec![""]
        } else {
            self.prefixes.iter().map(String::as_str).collect()
        }
    }
}

enum KeyOutcome {
    Migrated,
    Failed(MigrationFailure),
    /// Cancellation fired before this key was attempted.
    NotAttempted,
}

/// Runs [`MigrationRequest`]s against a [`StoreClient`].
#[derive(Debug, Clone)]
pub struct Migrator {
    client: StoreClient,
    concurrency: usize,
}

impl Migrator {
    /// Create a migrator with [`DEFAULT_CONCURRENCY`].
    #[must_use]
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set how many destination keys are processed at once (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Configured concurrency.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run a migration to completion.
    ///
    /// # Errors
    ///
    /// Fails only when the destination bucket cannot be verified or created.
    /// Every other problem is recorded in the returned report.
    pub async fn migrate(&self, request: &MigrationRequest) -> GatewayResult<MigrationReport> {
        self.migrate_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Run a migration that stops early once `cancel` fires.
    ///
    /// On cancellation the report gathered so far is returned with
    /// `cancelled` set; keys never attempted do not appear in it.
    ///
    /// # Errors
    ///
    /// Same as [`Migrator::migrate`].
    pub async fn migrate_with_cancel(
        &self,
        request: &MigrationRequest,
        cancel: CancellationToken,
    ) -> GatewayResult<MigrationReport> {
        let src = request.source_bucket.as_str();
        let dst = request.destination_bucket.as_str();
        info!(
            src_bucket = %src,
            dst_bucket = %dst,
            prefixes = ?request.prefixes,
            overwrite = request.overwrite,
            remove_source = request.remove_source,
            rename = ?request.rename,
            "starting migration"
        );

        self.client
            .ensure_bucket(dst)
            .await
            .map_err(|source| GatewayError::DestinationBucket {
                bucket: dst.to_owned(),
                source,
            })?;

        let mut report = MigrationReport::default();
        let (candidates, listing_complete) =
            self.collect_candidates(request, &cancel, &mut report).await;
        debug!(count = candidates.len(), "collected candidate keys");

        // One writer per destination key; sources inside a group stay in
        // lexicographic order because the candidate set is ordered.
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in candidates {
            groups.entry(request.rename.apply(&key)).or_default().push(key);
        }

        let cancel = &cancel;
        let mut outcomes: Vec<(String, KeyOutcome)> = futures::stream::iter(groups)
            .map(|(dst_key, src_keys)| self.migrate_group(request, dst_key, src_keys, cancel))
            .buffered(self.concurrency)
            .flat_map(futures::stream::iter)
            .collect()
            .await;
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        report.cancelled = !listing_complete;
        for (_, outcome) in outcomes {
            match outcome {
                KeyOutcome::Migrated => report.success_count += 1,
                KeyOutcome::Failed(failure) => report.failed.push(failure),
                KeyOutcome::NotAttempted => report.cancelled = true,
            }
        }

        info!(
            src_bucket = %src,
            dst_bucket = %dst,
            success = report.success_count,
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "migration finished"
        );
        Ok(report)
    }

    /// Enumerate every prefix into a deduplicated, ordered key set.
    ///
    /// A listing error is recorded against its prefix; keys yielded before
    /// the error are kept and the next prefix is still listed. The flag is
    /// false when cancellation cut the enumeration short.
    async fn collect_candidates(
        &self,
        request: &MigrationRequest,
        cancel: &CancellationToken,
        report: &mut MigrationReport,
    ) -> (BTreeSet<String>, bool) {
        let store = self.client.store();
        let src = request.source_bucket.as_str();
        let mut keys = BTreeSet::new();

        for prefix in request.effective_prefixes() {
            let mut listing = store.list_objects(src, prefix);
            loop {
                let item = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return (keys, false),
                    item = listing.next() => item,
                };
                match item {
                    Some(Ok(info)) => {
                        keys.insert(info.key);
                    }
                    Some(Err(e)) => {
                        warn!(src_bucket = %src, prefix = %prefix, error = %e, "listing failed");
                        report.failed.push(MigrationFailure::list_error(prefix, &e));
                        break;
                    }
                    None => break,
                }
            }
        }

        (keys, true)
    }

    async fn migrate_group(
        &self,
        request: &MigrationRequest,
        dst_key: String,
        src_keys: Vec<String>,
        cancel: &CancellationToken,
    ) -> Vec<(String, KeyOutcome)> {
        let mut outcomes = Vec::with_capacity(src_keys.len());
        for src_key in src_keys {
            if cancel.is_cancelled() {
                outcomes.push((src_key, KeyOutcome::NotAttempted));
                break;
            }
            let outcome = self.migrate_key(request, &src_key, &dst_key).await;
            outcomes.push((src_key, outcome));
        }
        outcomes
    }

    async fn migrate_key(
        &self,
        request: &MigrationRequest,
        src_key: &str,
        dst_key: &str,
    ) -> KeyOutcome {
        let store = self.client.store();
        let src = request.source_bucket.as_str();
        let dst = request.destination_bucket.as_str();

        if !request.overwrite {
            match store.stat_object(dst, dst_key).await {
                Ok(Some(_)) => {
                    debug!(src_key = %src_key, dst_key = %dst_key, "destination exists, skipping");
                    return KeyOutcome::Failed(MigrationFailure::for_key(
                        FailureKind::DestinationExists,
                        src_key,
                        dst_key,
                        format!("destination {dst}/{dst_key} already exists, skipped"),
                    ));
                }
                Ok(None) => {}
                // Not known to exist: let the copy decide.
                Err(e) => {
                    debug!(dst_key = %dst_key, error = %e, "stat failed, copying anyway");
                }
            }
        }

        if let Err(e) = store.copy_object(src, src_key, dst, dst_key).await {
            warn!(src_key = %src_key, dst_key = %dst_key, error = %e, "copy failed");
            return KeyOutcome::Failed(MigrationFailure::for_key(
                FailureKind::CopyError,
                src_key,
                dst_key,
                format!("copy {src}/{src_key} -> {dst}/{dst_key} failed: {e}"),
            ));
        }

        if request.remove_source {
            if let Err(e) = store.remove_object(src, src_key).await {
                warn!(src_key = %src_key, error = %e, "removing source failed");
                return KeyOutcome::Failed(MigrationFailure::for_key(
                    FailureKind::RemoveError,
                    src_key,
                    dst_key,
                    format!("copied to {dst}/{dst_key} but removing source failed: {e}"),
                ));
            }
        }

        debug!(src_key = %src_key, dst_key = %dst_key, "object migrated");
        KeyOutcome::Migrated
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::store::{InMemoryStore, ObjectStore};

    async fn seeded(keys: &[&str]) -> (Arc<InMemoryStore>, Migrator) {
        let store = Arc::new(InMemoryStore::new());
        store.create_bucket("src").await.unwrap();
        for key in keys {
            store
                .put_object("src", key, Bytes::from(key.to_string()), "text/plain")
                .await
                .unwrap();
        }
        let client = StoreClient::new(Arc::clone(&store) as Arc<dyn ObjectStore>);
        (store, Migrator::new(client))
    }

    fn request() -> MigrationRequest {
        MigrationRequest::builder()
            .source_bucket("src")
            .destination_bucket("dst")
            .build()
    }

    #[test]
    fn test_should_default_to_whole_bucket() {
        assert_eq!(request().effective_prefixes(), vec![""]);
    }

    #[test]
    fn test_should_deserialize_request_with_defaults() {
        let request: MigrationRequest =
            serde_json::from_str(r#"{"sourceBucket":"a","destinationBucket":"b"}"#).unwrap();
        assert!(request.prefixes.is_empty());
        assert!(!request.overwrite);
        assert!(!request.remove_source);
        assert_eq!(request.rename.apply("k"), "k");
    }

    #[test]
    fn test_should_reject_missing_buckets() {
        let request = MigrationRequest::builder()
            .source_bucket("")
            .destination_bucket("b")
            .build();
        assert!(matches!(
            request.validate(),
            Err(GatewayError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_should_clamp_concurrency() {
        let client = StoreClient::new(Arc::new(InMemoryStore::new()));
        assert_eq!(Migrator::new(client).with_concurrency(0).concurrency(), 1);
    }

    #[tokio::test]
    async fn test_should_create_destination_and_copy_everything() {
        let (store, migrator) = seeded(&["a", "b/c"]).await;
        let report = migrator.migrate(&request()).await.unwrap();
        assert_eq!(report.success_count, 2);
        assert!(report.is_clean());
        assert_eq!(store.object_count("dst"), 2);
        assert_eq!(store.object_count("src"), 2);
    }

    #[tokio::test]
    async fn test_should_return_empty_report_without_matches() {
        let (_, migrator) = seeded(&["a"]).await;
        let request = MigrationRequest::builder()
            .source_bucket("src")
            .destination_bucket("dst")
            .prefixes(vec!["nothing/".to_owned()])
            .build();
        let report = migrator.migrate(&request).await.unwrap();
        assert_eq!(report, MigrationReport::default());
    }

    #[tokio::test]
    async fn test_should_remove_source_after_copy() {
        let (store, migrator) = seeded(&["a", "b"]).await;
        let request = MigrationRequest::builder()
            .source_bucket("src")
            .destination_bucket("dst")
            .remove_source(true)
            .build();
        let report = migrator.migrate(&request).await.unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(store.object_count("src"), 0);
        assert_eq!(store.object_count("dst"), 2);
    }

    #[tokio::test]
    async fn test_should_record_missing_source_bucket_as_list_error() {
        let (_, migrator) = seeded(&[]).await;
        let request = MigrationRequest::builder()
            .source_bucket("ghost")
            .destination_bucket("dst")
            .build();
        let report = migrator.migrate(&request).await.unwrap();
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].kind, FailureKind::ListError);
        assert_eq!(report.failed[0].object_key, "");
    }

    #[tokio::test]
    async fn test_should_allow_self_migration() {
        let (_, migrator) = seeded(&["a"]).await;
        let request = MigrationRequest::builder()
            .source_bucket("src")
            .destination_bucket("src")
            .overwrite(true)
            .build();
        let report = migrator.migrate(&request).await.unwrap();
        assert_eq!(report.success_count, 1);
    }
}
