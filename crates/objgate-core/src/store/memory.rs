//! In-memory object store.
//!
//! Buckets live in a [`DashMap`]; each bucket keeps its objects in an ordered
//! map behind a `parking_lot` lock so prefix listings come out sorted. Used
//! for development (`STORE_BACKEND=memory`) and throughout the test suite.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use md5::{Digest, Md5};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{ObjectData, ObjectInfo, ObjectStore, ObjectStream};
use crate::error::{StoreError, StoreResult};

/// A stored object body plus its metadata.
#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    etag: String,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn info(&self, key: &str) -> ObjectInfo {
        ObjectInfo {
            key: key.to_owned(),
            size: self.data.len() as u64,
            etag: self.etag.clone(),
            last_modified: Some(self.last_modified),
            content_type: Some(self.content_type.clone()),
        }
    }
}

/// Objects of one bucket, ordered by key.
#[derive(Debug, Default)]
struct MemoryBucket {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

/// Process-local [`ObjectStore`] implementation.
///
/// # Examples
///
/// ```
/// use objgate_core::store::{InMemoryStore, ObjectStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// store.create_bucket("public").await.unwrap();
/// assert!(store.bucket_exists("public").await.unwrap());
/// # });
/// ```
pub struct InMemoryStore {
    buckets: DashMap<String, MemoryBucket>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("bucket_count", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Drop a bucket and all of its objects. Returns whether it existed.
    ///
    /// This bypasses any [`super::BucketCache`] in front of the store, the
    /// same way an administrator deleting a bucket out-of-band would.
    pub fn delete_bucket(&self, bucket: &str) -> bool {
        self.buckets.remove(bucket).is_some()
    }

    /// Number of objects in `bucket` (zero if the bucket does not exist).
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .get(bucket)
            .map_or(0, |b| b.objects.read().len())
    }

    /// Remove every bucket.
    pub fn reset(&self) {
        debug!("resetting in-memory store");
        self.buckets.clear();
    }

    fn read_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        let b = self.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        let objects = b.objects.read();
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })
    }

    fn write_object(&self, bucket: &str, key: &str, object: StoredObject) -> StoreResult<()> {
        let b = self.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        b.objects.write().insert(key.to_owned(), object);
        Ok(())
    }
}

fn no_such_bucket(bucket: &str) -> StoreError {
    StoreError::NoSuchBucket {
        bucket: bucket.to_owned(),
    }
}

/// Quoted hex MD5, matching what S3 reports for single-part uploads.
fn compute_etag(data: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(data)))
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        Ok(self.buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        match self.buckets.entry(bucket.to_owned()) {
            Entry::Occupied(_) => Err(StoreError::BucketAlreadyExists {
                bucket: bucket.to_owned(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(MemoryBucket::default());
                info!(bucket = %bucket, "bucket created");
                Ok(())
            }
        }
    }

    fn list_objects<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ObjectStream<'a> {
        let Some(b) = self.buckets.get(bucket) else {
            return futures::stream::once(async move { Err(no_such_bucket(bucket)) }).boxed();
        };

        // Snapshot so the lock is not held while the caller consumes the stream.
        let items: Vec<StoreResult<ObjectInfo>> = b
            .objects
            .read()
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| Ok(obj.info(key)))
            .collect();
        drop(b);

        futures::stream::iter(items).boxed()
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectInfo>> {
        match self.read_object(bucket, key) {
            Ok(obj) => Ok(Some(obj.info(key))),
            Err(StoreError::NoSuchKey { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        let mut object = self.read_object(src_bucket, src_key)?;
        object.last_modified = Utc::now();
        self.write_object(dst_bucket, dst_key, object)?;
        debug!(src_bucket, src_key, dst_bucket, dst_key, "object copied");
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let b = self.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        // Deleting a missing key succeeds, as in S3.
        b.objects.write().remove(key);
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<ObjectInfo> {
        let object = StoredObject {
            etag: compute_etag(&data),
            data,
            content_type: content_type.to_owned(),
            last_modified: Utc::now(),
        };
        let info = object.info(key);
        self.write_object(bucket, key, object)?;
        Ok(info)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectData> {
        let object = self.read_object(bucket, key)?;
        Ok(ObjectData {
            data: object.data,
            content_type: Some(object.content_type),
        })
    }
}
