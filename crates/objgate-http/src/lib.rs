//! HTTP layer of the objgate gateway.
//!
//! - **Routing** ([`router`]): maps method and path to a [`Route`] and decodes
//!   query strings.
//! - **Multipart** ([`multipart`]): parses `multipart/form-data` uploads.
//! - **Handlers** ([`handlers`]): upload, download, list, presign, delete, and
//!   migrate, on top of [`objgate_core::store::StoreClient`].
//! - **Service** ([`service`]): the hyper [`GatewayHttpService`] that collects
//!   bodies, dispatches, and stamps common headers.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayHttpService (hyper Service)
//!     -> router::resolve (method + path)
//!     -> body collection (max_body_size)
//!     -> GatewayHandler::handle
//!     -> error_to_response on failure ({"error": ...})
//!     -> common headers (x-request-id, Server)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use objgate_core::store::{InMemoryStore, StoreClient};
//! use objgate_http::service::{GatewayHttpService, HttpConfig};
//!
//! let client = StoreClient::new(Arc::new(InMemoryStore::new()));
//! let service = GatewayHttpService::new(client, HttpConfig::default());
//! // Use `service` with a hyper server.
//! ```

pub mod body;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod response;
pub mod router;
pub mod service;

pub use body::GatewayBody;
pub use error::HttpError;
pub use handlers::GatewayHandler;
pub use router::{QueryParams, Route};
pub use service::{GatewayHttpService, HttpConfig};
