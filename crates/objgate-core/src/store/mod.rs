//! Object store contract and adapters.
//!
//! The migration engine and the HTTP layer only ever talk to
//! [`ObjectStore`]; SDK types stay inside the adapters.
//!
//! ```text
//!   Migrator / HTTP handlers
//!            |
//!            v
//!   StoreClient (bucket cache, path strategy)
//!            |
//!            v
//!   dyn ObjectStore ── S3Store (aws-sdk-s3)
//!                   └─ InMemoryStore
//! ```

mod cache;
mod client;
mod memory;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::config::{GatewayConfig, StoreBackend};
use crate::error::{StoreError, StoreResult};

pub use cache::BucketCache;
pub use client::StoreClient;
pub use memory::InMemoryStore;
pub use s3::{S3Store, S3StoreOptions};

/// Construct the backend selected by `config.store_backend`.
#[must_use]
pub fn build_store(config: &GatewayConfig) -> Arc<dyn ObjectStore> {
    match config.store_backend {
        StoreBackend::S3 => Arc::new(S3Store::new(&S3StoreOptions::from_config(config))),
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
    }
}

/// Metadata describing one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Entity tag as reported by the store (usually a quoted MD5).
    pub etag: String,
    /// Last modification time, when the store reports one.
    pub last_modified: Option<DateTime<Utc>>,
    /// Content type, when the store reports one (listings usually do not).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// An object body together with its content type.
#[derive(Debug, Clone)]
pub struct ObjectData {
    /// Object bytes.
    pub data: Bytes,
    /// Content type recorded on the object.
    pub content_type: Option<String>,
}

/// Lazily produced listing results.
///
/// An `Err` item ends the listing; items yielded before it remain valid.
pub type ObjectStream<'a> = BoxStream<'a, StoreResult<ObjectInfo>>;

/// Capability contract of an S3-compatible object store.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Short backend name used in logs and errors.
    fn backend_name(&self) -> &'static str;

    /// Whether `bucket` exists.
    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool>;

    /// Create `bucket`.
    ///
    /// Returns [`StoreError::BucketAlreadyExists`] when the bucket is already
    /// there.
    async fn create_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Recursively list every object whose key starts with `prefix`.
    fn list_objects<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ObjectStream<'a>;

    /// Look up an object, returning `None` if it does not exist.
    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectInfo>>;

    /// Server-side copy, preserving content and content type.
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()>;

    /// Delete an object.
    async fn remove_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// Store `data` under `key`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<ObjectInfo>;

    /// Fetch an object body.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectData>;

    /// Produce a presigned GET URL valid for `expiry`.
    async fn presign_get(&self, bucket: &str, key: &str, expiry: Duration) -> StoreResult<String> {
        let _ = (bucket, key, expiry);
        Err(StoreError::Unsupported {
            backend: self.backend_name(),
            operation: "presigned URLs",
        })
    }
}
