//! The store client shared by HTTP handlers and the migration engine.
//!
//! [`StoreClient`] pairs an [`ObjectStore`] with the process-wide
//! [`BucketCache`] and exposes folder/name based file operations that run
//! every key through [`crate::path::build_key`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use tracing::{debug, info};

use super::{BucketCache, ObjectData, ObjectInfo, ObjectStore};
use crate::error::{GatewayResult, StoreError, StoreResult};
use crate::path::{build_key, folder_prefix};

/// Cheaply cloneable handle to an object store plus its bucket cache.
#[derive(Debug, Clone)]
pub struct StoreClient {
    store: Arc<dyn ObjectStore>,
    buckets: Arc<BucketCache>,
}

impl StoreClient {
    /// Wrap a store with a fresh bucket cache.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            buckets: Arc::new(BucketCache::new()),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// The bucket existence cache.
    #[must_use]
    pub fn bucket_cache(&self) -> &BucketCache {
        &self.buckets
    }

    /// Make sure `bucket` exists, creating it if needed.
    ///
    /// Cached buckets return immediately without touching the store. A
    /// concurrent creator winning the race is not an error.
    pub async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        if self.buckets.contains(bucket) {
            return Ok(());
        }

        if !self.store.bucket_exists(bucket).await? {
            match self.store.create_bucket(bucket).await {
                Ok(()) => info!(bucket = %bucket, "created missing bucket"),
                Err(StoreError::BucketAlreadyExists { .. }) => {
                    debug!(bucket = %bucket, "bucket created concurrently");
                }
                Err(e) => return Err(e),
            }
        }

        self.buckets.mark_exists(bucket);
        Ok(())
    }

    /// Upload `data` as `folder/name`.
    pub async fn upload_file(
        &self,
        bucket: &str,
        folder: &str,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> GatewayResult<ObjectInfo> {
        let key = build_key(folder, name);
        let size = data.len();
        let info = self.store.put_object(bucket, &key, data, content_type).await?;
        debug!(bucket = %bucket, key = %key, size, content_type, "uploaded object");
        Ok(info)
    }

    /// Fetch `folder/name`.
    pub async fn download_file(
        &self,
        bucket: &str,
        folder: &str,
        name: &str,
    ) -> GatewayResult<ObjectData> {
        let key = build_key(folder, name);
        let object = self.store.get_object(bucket, &key).await?;
        debug!(bucket = %bucket, key = %key, size = object.data.len(), "downloaded object");
        Ok(object)
    }

    /// Delete `folder/name`.
    pub async fn delete_file(&self, bucket: &str, folder: &str, name: &str) -> GatewayResult<()> {
        let key = build_key(folder, name);
        self.store.remove_object(bucket, &key).await?;
        debug!(bucket = %bucket, key = %key, "deleted object");
        Ok(())
    }

    /// List every object under `folder` (recursively).
    ///
    /// Unlike a migration, a listing error fails the whole call.
    pub async fn list_files(&self, bucket: &str, folder: &str) -> GatewayResult<Vec<ObjectInfo>> {
        let prefix = folder_prefix(folder);
        let objects: Vec<ObjectInfo> = self
            .store
            .list_objects(bucket, &prefix)
            .try_collect()
            .await?;
        debug!(bucket = %bucket, prefix = %prefix, count = objects.len(), "listed objects");
        Ok(objects)
    }

    /// Presigned GET URL for `folder/name`.
    pub async fn presigned_url(
        &self,
        bucket: &str,
        folder: &str,
        name: &str,
        expiry: Duration,
    ) -> GatewayResult<String> {
        let key = build_key(folder, name);
        Ok(self.store.presign_get(bucket, &key, expiry).await?)
    }
}
