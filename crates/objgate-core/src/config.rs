//! Gateway configuration.
//!
//! Provides [`GatewayConfig`] for configuring the objgate service. Values are
//! loaded from environment variables, falling back to defaults that match a
//! local MinIO deployment.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Which object store backend the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// An S3-compatible endpoint (AWS S3, MinIO, ...).
    #[default]
    S3,
    /// A process-local in-memory store, useful for development.
    Memory,
}

impl StoreBackend {
    /// Parse a backend name, accepting `"s3"`/`"minio"` and `"memory"`/`"mem"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "s3" | "minio" => Some(Self::S3),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Gateway configuration.
///
/// # Examples
///
/// ```
/// use objgate_core::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8880");
/// assert_eq!(config.public_bucket, "public");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the HTTP gateway.
    #[builder(default = String::from("0.0.0.0:8880"))]
    pub gateway_listen: String,

    /// Object store backend.
    #[builder(default)]
    pub store_backend: StoreBackend,

    /// Endpoint URL of the S3-compatible store.
    #[builder(default = String::from("http://localhost:9000"))]
    pub s3_endpoint: String,

    /// Access key used to sign store requests.
    #[builder(default = String::from("minioadmin"))]
    pub s3_access_key: String,

    /// Secret key used to sign store requests.
    #[serde(skip_serializing, default)]
    #[builder(default = String::from("minioadmin"))]
    pub s3_secret_key: String,

    /// Region reported to the store.
    #[builder(default = String::from("us-east-1"))]
    pub s3_region: String,

    /// Use path-style addressing (`endpoint/bucket/key`), required by MinIO.
    #[builder(default = true)]
    pub s3_force_path_style: bool,

    /// Bucket receiving uploads and serving downloads.
    #[builder(default = String::from("public"))]
    pub public_bucket: String,

    /// Base URL handed back to clients after an upload (usually a proxy in front of the store).
    #[builder(default = String::from("http://localhost/files/"))]
    pub public_base_url: String,

    /// Local directory that downloaded objects are written to.
    #[builder(default = String::from("./download"))]
    pub download_dir: String,

    /// Number of destination keys migrated concurrently.
    #[builder(default = 8)]
    pub migration_concurrency: usize,

    /// Uploads larger than this many bytes use multipart upload.
    #[builder(default = 16 * 1024 * 1024)]
    pub upload_part_size: usize,

    /// Maximum accepted request body size in bytes.
    #[builder(default = 512 * 1024 * 1024)]
    pub max_body_size: usize,

    /// Default lifetime of presigned URLs, in seconds.
    #[builder(default = 3600)]
    pub presign_expiry_secs: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8880` |
    /// | `STORE_BACKEND` | `s3` |
    /// | `S3_ENDPOINT` | `http://localhost:9000` |
    /// | `S3_ACCESS_KEY` | `minioadmin` |
    /// | `S3_SECRET_KEY` | `minioadmin` |
    /// | `S3_REGION` | `us-east-1` |
    /// | `S3_FORCE_PATH_STYLE` | `true` |
    /// | `PUBLIC_BUCKET` | `public` |
    /// | `PUBLIC_BASE_URL` | `http://localhost/files/` |
    /// | `DOWNLOAD_DIR` | `./download` |
    /// | `MIGRATION_CONCURRENCY` | `8` |
    /// | `UPLOAD_PART_SIZE` | `16777216` |
    /// | `MAX_BODY_SIZE` | `536870912` |
    /// | `PRESIGN_EXPIRY_SECS` | `3600` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparseable numeric or enum values are ignored and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("STORE_BACKEND") {
            if let Some(backend) = StoreBackend::parse(&v) {
                config.store_backend = backend;
            }
        }
        if let Ok(v) = std::env::var("S3_ENDPOINT") {
            config.s3_endpoint = v;
        }
        if let Ok(v) = std::env::var("S3_ACCESS_KEY") {
            config.s3_access_key = v;
        }
        if let Ok(v) = std::env::var("S3_SECRET_KEY") {
            config.s3_secret_key = v;
        }
        if let Ok(v) = std::env::var("S3_REGION") {
            config.s3_region = v;
        }
        if let Ok(v) = std::env::var("S3_FORCE_PATH_STYLE") {
            config.s3_force_path_style = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("PUBLIC_BUCKET") {
            config.public_bucket = v;
        }
        if let Ok(v) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = v;
        }
        if let Ok(v) = std::env::var("DOWNLOAD_DIR") {
            config.download_dir = v;
        }
        if let Some(n) = parse_env("MIGRATION_CONCURRENCY") {
            config.migration_concurrency = n;
        }
        if let Some(n) = parse_env("UPLOAD_PART_SIZE") {
            config.upload_part_size = n;
        }
        if let Some(n) = parse_env("MAX_BODY_SIZE") {
            config.max_body_size = n;
        }
        if let Some(n) = parse_env("PRESIGN_EXPIRY_SECS") {
            config.presign_expiry_secs = n;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Read and parse a numeric environment variable.
fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
