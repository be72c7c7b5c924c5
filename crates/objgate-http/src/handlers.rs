//! Route handlers.
//!
//! Each handler takes the request parts and the collected body and returns a
//! JSON response. Store and migration errors convert into [`HttpError`] via
//! `?`.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use objgate_core::error::GatewayError;
use objgate_core::migrate::{MigrationReport, MigrationRequest, Migrator};
use objgate_core::path::split_key;
use objgate_core::store::{ObjectInfo, StoreClient};
use objgate_core::upload::{classify, object_name};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::HttpError;
use crate::multipart::{extract_boundary, parse_multipart};
use crate::response::{GatewayResponse, no_content, ok_json};
use crate::router::{QueryParams, Route};
use crate::service::HttpConfig;

/// Longest presigned URL lifetime S3 accepts (7 days).
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse<'a> {
    message: &'static str,
    base_url: &'a str,
    file_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadResponse {
    message: &'static str,
    file_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    message: &'static str,
    file_urls: Vec<ObjectInfo>,
}

#[derive(Debug, Serialize)]
struct PresignResponse {
    message: &'static str,
    url: String,
}

#[derive(Debug, Serialize)]
struct MigrateResponse {
    message: &'static str,
    result: MigrationReport,
}

/// Business logic behind every route.
#[derive(Debug, Clone)]
pub struct GatewayHandler {
    client: StoreClient,
    migrator: Migrator,
    config: HttpConfig,
    shutdown: CancellationToken,
}

impl GatewayHandler {
    /// Create a handler over `client`.
    ///
    /// The migrator shares the client, and therefore its bucket cache.
    #[must_use]
    pub fn new(client: StoreClient, config: HttpConfig) -> Self {
        let migrator =
            Migrator::new(client.clone()).with_concurrency(config.migration_concurrency);
        Self {
            client,
            migrator,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops in-flight migrations when cancelled.
    ///
    /// Each migration runs on a child token, so a cancelled migration
    /// returns its partial report instead of holding up shutdown.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// The store client.
    #[must_use]
    pub fn client(&self) -> &StoreClient {
        &self.client
    }

    /// Handler configuration.
    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Run the handler for `route`.
    pub async fn handle(
        &self,
        route: Route,
        parts: &http::request::Parts,
        body: Bytes,
    ) -> Result<GatewayResponse, HttpError> {
        let query = QueryParams::from_uri(&parts.uri);
        match route {
            Route::Health => ok_json(&HealthResponse {
                status: "running",
                service: "objgate",
            }),
            Route::Upload => self.upload(&parts.headers, &body).await,
            Route::Download => self.download(&query).await,
            Route::List => self.list(&query).await,
            Route::Presign => self.presign(&query).await,
            Route::DeleteFile => self.delete(&query).await,
            Route::Migrate => self.migrate(&body).await,
        }
    }

    async fn upload(
        &self,
        headers: &http::HeaderMap,
        body: &Bytes,
    ) -> Result<GatewayResponse, HttpError> {
        let content_type = headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| HttpError::bad_request("No file provided"))?;
        let boundary = extract_boundary(content_type)?;
        let form = parse_multipart(body, &boundary)?;
        let file = form
            .file("file")
            .ok_or_else(|| HttpError::bad_request("No file provided"))?;

        let class = classify(&file.filename)?;
        let name = object_name(Utc::now(), &class.extension);
        let bucket = self.config.public_bucket.as_str();

        self.client.ensure_bucket(bucket).await?;
        let info = self
            .client
            .upload_file(
                bucket,
                class.folder(),
                &name,
                file.data.clone(),
                class.content_type.as_ref(),
            )
            .await?;

        info!(bucket = %bucket, key = %info.key, size = info.size, "file uploaded");
        ok_json(&UploadResponse {
            message: "File uploaded successfully",
            base_url: &self.config.public_base_url,
            file_url: info.key,
        })
    }

    async fn download(&self, query: &QueryParams) -> Result<GatewayResponse, HttpError> {
        let file_url = query.require("fileUrl")?;
        let (folder, name) = match file_url.split('/').collect::<Vec<_>>().as_slice() {
            [folder, name] if !folder.is_empty() && is_plain_name(name) => (*folder, *name),
            _ => return Err(HttpError::bad_request("Error fileUrl param")),
        };

        let object = self
            .client
            .download_file(&self.config.public_bucket, folder, name)
            .await?;

        let dir = &self.config.download_dir;
        let path = dir.join(name);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| GatewayError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        tokio::fs::write(&path, &object.data)
            .await
            .map_err(|source| GatewayError::Io {
                path: path.display().to_string(),
                source,
            })?;

        info!(
            key = %file_url,
            path = %path.display(),
            size = object.data.len(),
            "file downloaded"
        );
        ok_json(&DownloadResponse {
            message: "File download successfully",
            file_url: path.display().to_string(),
        })
    }

    async fn list(&self, query: &QueryParams) -> Result<GatewayResponse, HttpError> {
        let bucket = query.require("bucket")?;
        let folder = query.get("folder").unwrap_or_default();
        let objects = self.client.list_files(bucket, folder).await?;
        ok_json(&ListResponse {
            message: "File list successfully",
            file_urls: objects,
        })
    }

    async fn presign(&self, query: &QueryParams) -> Result<GatewayResponse, HttpError> {
        let (folder, name) = file_location(query)?;
        let expiry = match query.get("expirySecs") {
            None | Some("") => self.config.presign_expiry,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if (1..=MAX_PRESIGN_EXPIRY_SECS).contains(&secs) => {
                    Duration::from_secs(secs)
                }
                _ => {
                    return Err(HttpError::bad_request(format!(
                        "expirySecs must be between 1 and {MAX_PRESIGN_EXPIRY_SECS}"
                    )));
                }
            },
        };

        let url = self
            .client
            .presigned_url(&self.config.public_bucket, folder, name, expiry)
            .await?;
        ok_json(&PresignResponse {
            message: "Presigned URL generated",
            url,
        })
    }

    async fn delete(&self, query: &QueryParams) -> Result<GatewayResponse, HttpError> {
        let (folder, name) = file_location(query)?;
        self.client
            .delete_file(&self.config.public_bucket, folder, name)
            .await?;
        info!(folder = %folder, name = %name, "file deleted");
        Ok(no_content())
    }

    async fn migrate(&self, body: &Bytes) -> Result<GatewayResponse, HttpError> {
        let request: MigrationRequest = serde_json::from_slice(body)
            .map_err(|e| HttpError::bad_request(format!("Invalid migration request: {e}")))?;
        request.validate()?;

        let report = self
            .migrator
            .migrate_with_cancel(&request, self.shutdown.child_token())
            .await?;
        if report.cancelled {
            warn!(success = report.success_count, "migration interrupted by shutdown");
        }
        if !report.failed.is_empty() {
            warn!(
                failed = report.failed.len(),
                errors = report.error_count(),
                "migration finished with failures"
            );
        }
        ok_json(&MigrateResponse {
            message: "Migration completed",
            result: report,
        })
    }
}

/// `fileUrl` split into `(folder, name)` on its last `/`.
fn file_location(query: &QueryParams) -> Result<(&str, &str), HttpError> {
    let file_url = query.require("fileUrl")?;
    let (folder, name) = split_key(file_url);
    if name.is_empty() {
        return Err(HttpError::bad_request("Error fileUrl param"));
    }
    Ok((folder, name))
}

/// A name safe to use as a single path component in the download directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('\\')
}
