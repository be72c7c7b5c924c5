//! S3-compatible object store adapter built on `aws-sdk-s3`.
//!
//! Works against AWS S3 and MinIO alike: static credentials, a custom
//! endpoint, and optional path-style addressing. SDK errors are mapped to
//! [`StoreError`] here so nothing upstream depends on SDK types.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use super::{ObjectData, ObjectInfo, ObjectStore, ObjectStream};
use crate::config::GatewayConfig;
use crate::error::{StoreError, StoreResult};

/// Characters left unescaped in the key portion of `x-amz-copy-source`.
const COPY_SOURCE_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Smallest part size S3 accepts for every part except the last.
const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// The region where `CreateBucket` must not carry a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for [`S3Store`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct S3StoreOptions {
    /// Endpoint URL (e.g. `http://localhost:9000`).
    #[builder(setter(into))]
    pub endpoint: String,
    /// Access key ID.
    #[builder(setter(into))]
    pub access_key: String,
    /// Secret access key.
    #[builder(setter(into))]
    pub secret_key: String,
    /// Signing region.
    #[builder(default = String::from(DEFAULT_REGION), setter(into))]
    pub region: String,
    /// Use `endpoint/bucket/key` URLs instead of virtual-hosted style.
    #[builder(default = true)]
    pub force_path_style: bool,
    /// Uploads above this size are sent as multipart uploads.
    #[builder(default = 16 * 1024 * 1024)]
    pub part_size: usize,
}

impl S3StoreOptions {
    /// Derive store options from the gateway configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            endpoint: config.s3_endpoint.clone(),
            access_key: config.s3_access_key.clone(),
            secret_key: config.s3_secret_key.clone(),
            region: config.s3_region.clone(),
            force_path_style: config.s3_force_path_style,
            part_size: config.upload_part_size,
        }
    }
}

/// [`ObjectStore`] backed by an S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    region: String,
    part_size: usize,
}

impl S3Store {
    /// Build a client from static credentials.
    #[must_use]
    pub fn new(options: &S3StoreOptions) -> Self {
        let creds = Credentials::new(
            options.access_key.clone(),
            options.secret_key.clone(),
            None,
            None,
            "objgate-static",
        );

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(options.region.clone()))
            .credentials_provider(creds)
            .endpoint_url(options.endpoint.clone())
            .force_path_style(options.force_path_style)
            .build();

        info!(
            endpoint = %options.endpoint,
            region = %options.region,
            path_style = options.force_path_style,
            "configured S3 store"
        );

        Self::from_client(Client::from_conf(config), &options.region, options.part_size)
    }

    /// Wrap an already configured SDK client.
    #[must_use]
    pub fn from_client(client: Client, region: &str, part_size: usize) -> Self {
        Self {
            client,
            region: region.to_owned(),
            part_size: part_size.max(MIN_PART_SIZE),
        }
    }

    /// Upload `data` in `part_size` chunks, aborting the upload on any failure.
    async fn put_multipart(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<Option<String>> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(sdk_error)?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| StoreError::backend("store returned no multipart upload id"))?
            .to_owned();

        let result = self.upload_parts(bucket, key, &upload_id, &data).await;
        let parts = match result {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(
                        bucket, key, upload_id = %upload_id,
                        error = %DisplayErrorContext(&abort_err),
                        "failed to abort multipart upload"
                    );
                }
                return Err(e);
            }
        };

        let completed = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(completed.e_tag().map(str::to_owned))
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        data: &Bytes,
    ) -> StoreResult<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        for (index, start) in (0..data.len()).step_by(self.part_size).enumerate() {
            let end = (start + self.part_size).min(data.len());
            let part_number = i32::try_from(index + 1)
                .map_err(|_| StoreError::backend("upload exceeds the maximum part count"))?;

            let output = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(data.slice(start..end)))
                .send()
                .await
                .map_err(sdk_error)?;

            debug!(bucket, key, part_number, "uploaded part");
            parts.push(
                CompletedPart::builder()
                    .set_e_tag(output.e_tag().map(str::to_owned))
                    .part_number(part_number)
                    .build(),
            );
        }
        Ok(parts)
    }
}

/// Render any SDK error with its full source chain.
fn sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    StoreError::backend(DisplayErrorContext(&err))
}

/// Convert an SDK timestamp into a chrono UTC timestamp.
fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

/// Build the `x-amz-copy-source` value for `bucket/key`.
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", utf8_percent_encode(key, COPY_SOURCE_KEY))
}

#[async_trait]
impl ObjectStore for S3Store {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(sdk_error(err)),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %bucket, "bucket created");
                Ok(())
            }
            Err(err)
                if err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                }) =>
            {
                Err(StoreError::BucketAlreadyExists {
                    bucket: bucket.to_owned(),
                })
            }
            Err(err) => Err(sdk_error(err)),
        }
    }

    fn list_objects<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ObjectStream<'a> {
        // State: `Some(token)` while pages remain (`Some(None)` is the first page).
        let pages = futures::stream::try_unfold(Some(None), move |state: Option<Option<String>>| async move {
            let Some(token) = state else {
                return Ok::<_, StoreError>(None);
            };

            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(token)
                .send()
                .await
                .map_err(|err| {
                    if err.as_service_error().is_some_and(|e| e.is_no_such_bucket()) {
                        StoreError::NoSuchBucket {
                            bucket: bucket.to_owned(),
                        }
                    } else {
                        sdk_error(err)
                    }
                })?;

            let items: Vec<StoreResult<ObjectInfo>> = output
                .contents()
                .iter()
                .filter_map(|obj| {
                    let key = obj.key()?;
                    Some(Ok(ObjectInfo {
                        key: key.to_owned(),
                        size: obj.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                        etag: obj.e_tag().unwrap_or_default().to_owned(),
                        last_modified: obj.last_modified().and_then(to_chrono),
                        content_type: None,
                    }))
                })
                .collect();

            let next = if output.is_truncated() == Some(true) {
                output
                    .next_continuation_token()
                    .map(|t| Some(t.to_owned()))
            } else {
                None
            };

            debug!(bucket, prefix, count = items.len(), "listed page");
            Ok(Some((futures::stream::iter(items), next)))
        });

        pages.try_flatten().boxed()
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectInfo>> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(Some(ObjectInfo {
                key: key.to_owned(),
                size: output
                    .content_length()
                    .and_then(|s| u64::try_from(s).ok())
                    .unwrap_or(0),
                etag: output.e_tag().unwrap_or_default().to_owned(),
                last_modified: output.last_modified().and_then(to_chrono),
                content_type: output.content_type().map(str::to_owned),
            })),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(None),
            Err(err) => Err(sdk_error(err)),
        }
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        // The default metadata directive (COPY) carries content type over.
        self.client
            .copy_object()
            .bucket(dst_bucket)
            .key(dst_key)
            .copy_source(copy_source(src_bucket, src_key))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<ObjectInfo> {
        let size = data.len() as u64;
        let etag = if data.len() > self.part_size {
            self.put_multipart(bucket, key, data, content_type).await?
        } else {
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(sdk_error)?
                .e_tag()
                .map(str::to_owned)
        };

        Ok(ObjectInfo {
            key: key.to_owned(),
            size,
            etag: etag.unwrap_or_default(),
            last_modified: Some(Utc::now()),
            content_type: Some(content_type.to_owned()),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectData> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(StoreError::NoSuchKey {
                    bucket: bucket.to_owned(),
                    key: key.to_owned(),
                });
            }
            Err(err) => return Err(sdk_error(err)),
        };

        let content_type = output.content_type().map(str::to_owned);
        let data = output
            .body
            .collect()
            .await
            .map_err(StoreError::backend)?
            .into_bytes();

        Ok(ObjectData { data, content_type })
    }

    async fn presign_get(&self, bucket: &str, key: &str, expiry: Duration) -> StoreResult<String> {
        let presigning = PresigningConfig::expires_in(expiry).map_err(StoreError::backend)?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(sdk_error)?;
        Ok(request.uri().to_owned())
    }
}
