//! The gateway HTTP service implementing hyper's `Service` trait.
//!
//! [`GatewayHttpService`] ties routing, body collection, and the route
//! handlers together:
//!
//! 1. Route resolution (`method`, `path`)
//! 2. Request body collection, capped at `max_body_size`
//! 3. Handler dispatch
//! 4. Error rendering as JSON
//! 5. Common response headers (`x-request-id`, `Server`)

use std::convert::Infallible;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use objgate_core::config::GatewayConfig;
use objgate_core::migrate::DEFAULT_CONCURRENCY;
use objgate_core::store::StoreClient;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::error::HttpError;
use crate::handlers::GatewayHandler;
use crate::response::{GatewayResponse, error_to_response};
use crate::router;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Value of the `Server` response header.
pub const SERVER_NAME: &str = "objgate";

/// Configuration of the HTTP layer.
#[derive(Debug, Clone, TypedBuilder)]
pub struct HttpConfig {
    /// Bucket receiving uploads and serving downloads and deletes.
    #[builder(default = String::from("public"), setter(into))]
    pub public_bucket: String,
    /// Base URL returned to clients after an upload.
    #[builder(default = String::from("http://localhost/files/"), setter(into))]
    pub public_base_url: String,
    /// Directory downloaded objects are written to.
    #[builder(default = PathBuf::from("./download"), setter(into))]
    pub download_dir: PathBuf,
    /// Presigned URL lifetime when the request does not specify one.
    #[builder(default = Duration::from_secs(3600))]
    pub presign_expiry: Duration,
    /// Largest accepted request body in bytes.
    #[builder(default = 512 * 1024 * 1024)]
    pub max_body_size: usize,
    /// Concurrency of `POST /migrate`.
    #[builder(default = DEFAULT_CONCURRENCY)]
    pub migration_concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HttpConfig {
    /// Derive the HTTP settings from the gateway configuration.
    #[must_use]
    pub fn from_gateway(config: &GatewayConfig) -> Self {
        Self::builder()
            .public_bucket(config.public_bucket.clone())
            .public_base_url(config.public_base_url.clone())
            .download_dir(PathBuf::from(&config.download_dir))
            .presign_expiry(Duration::from_secs(config.presign_expiry_secs))
            .max_body_size(config.max_body_size)
            .migration_concurrency(config.migration_concurrency)
            .build()
    }
}

/// The gateway hyper service.
#[derive(Debug, Clone)]
pub struct GatewayHttpService {
    handler: Arc<GatewayHandler>,
}

impl GatewayHttpService {
    /// Create a service over `client`.
    #[must_use]
    pub fn new(client: StoreClient, config: HttpConfig) -> Self {
        Self {
            handler: Arc::new(GatewayHandler::new(client, config)),
        }
    }

    /// The handler behind this service.
    #[must_use]
    pub fn handler(&self) -> &GatewayHandler {
        &self.handler
    }
}

impl Service<http::Request<Incoming>> for GatewayHttpService {
    type Response = GatewayResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response = process_request(req, &handler, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Process one request through routing, body collection, and the handler.
///
/// Generic over the body type so it can be driven without a socket.
pub async fn process_request<B>(
    req: http::Request<B>,
    handler: &GatewayHandler,
    request_id: &str,
) -> GatewayResponse
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let route = match router::resolve(&method, uri.path()) {
        Ok(route) => route,
        Err(err) => {
            debug!(%method, %uri, error = %err, request_id, "no route");
            return error_to_response(&err, request_id);
        }
    };
    info!(%route, %method, %uri, request_id, "routed request");

    let limit = handler.config().max_body_size;
    let (parts, body) = req.into_parts();
    let body = match collect_body(body, limit).await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, request_id, "failed to read request body");
            return error_to_response(&err, request_id);
        }
    };

    let response = match handler.handle(route, &parts, body).await {
        Ok(response) => response,
        Err(err) => {
            if !err.status().is_server_error() {
                warn!(%route, error = %err, request_id, "request rejected");
            }
            error_to_response(&err, request_id)
        }
    };

    debug!(
        %route,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis(),
        request_id,
        "request completed"
    );
    response
}

/// Collect a request body, failing once it exceeds `limit` bytes.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, HttpError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(HttpError::PayloadTooLarge { limit })
        }
        Err(err) => Err(HttpError::bad_request(format!(
            "Failed to read request body: {err}"
        ))),
    }
}

/// Add headers common to every response.
fn add_common_headers(mut response: GatewayResponse, request_id: &str) -> GatewayResponse {
    let headers = response.headers_mut();
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(
        http::header::SERVER,
        http::HeaderValue::from_static(SERVER_NAME),
    );
    response
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http_body_util::Full;
    use objgate_core::store::{InMemoryStore, ObjectStore};

    use super::*;
    use crate::body::GatewayBody;

    fn service(config: HttpConfig) -> GatewayHttpService {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::new());
        GatewayHttpService::new(StoreClient::new(store), config)
    }

    fn request(
        method: http::Method,
        uri: &str,
        body: &'static [u8],
    ) -> http::Request<Full<Bytes>> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body)))
            .unwrap_or_else(|e| panic!("request: {e}"))
    }

    async fn body_text(response: GatewayResponse) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap_or_else(|e| panic!("body: {e}"))
            .to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_should_answer_health_check() {
        let svc = service(HttpConfig::default());
        let response = process_request(
            request(http::Method::GET, "/_health", b""),
            svc.handler(),
            "req-1",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            r#"{"status":"running","service":"objgate"}"#
        );
    }

    #[tokio::test]
    async fn test_should_render_unknown_route_as_json_404() {
        let svc = service(HttpConfig::default());
        let response =
            process_request(request(http::Method::GET, "/nope", b""), svc.handler(), "req-2")
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("\"error\""));
    }

    #[tokio::test]
    async fn test_should_reject_oversized_body() {
        let svc = service(HttpConfig::builder().max_body_size(4).build());
        let response = process_request(
            request(http::Method::POST, "/migrate", b"{\"sourceBucket\":\"a\"}"),
            svc.handler(),
            "req-3",
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_should_migrate_over_http() {
        let svc = service(HttpConfig::default());
        let store = svc.handler().client().store();
        store.create_bucket("public").await.unwrap();
        store
            .put_object("public", "images/a.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();

        let response = process_request(
            request(
                http::Method::POST,
                "/migrate",
                br#"{"sourceBucket":"public","destinationBucket":"publicv1","prefixes":["images/"]}"#,
            ),
            svc.handler(),
            "req-4",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains(r#""successCount":1"#), "{text}");
        assert!(text.contains(r#""cancelled":false"#), "{text}");
    }

    #[test]
    fn test_should_add_common_headers() {
        let response = add_common_headers(http::Response::new(GatewayBody::empty()), "abc");
        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("abc")
        );
        assert_eq!(
            response
                .headers()
                .get(http::header::SERVER)
                .and_then(|v| v.to_str().ok()),
            Some("objgate")
        );
    }

    #[test]
    fn test_should_derive_config_from_gateway() {
        let gateway = GatewayConfig::builder()
            .public_bucket("assets".into())
            .presign_expiry_secs(60)
            .migration_concurrency(3)
            .build();
        let config = HttpConfig::from_gateway(&gateway);
        assert_eq!(config.public_bucket, "assets");
        assert_eq!(config.presign_expiry, Duration::from_secs(60));
        assert_eq!(config.migration_concurrency, 3);
        assert_eq!(config.download_dir, PathBuf::from("./download"));
    }
}
