//! Core of the objgate object-store gateway.
//!
//! This crate holds everything below the HTTP layer: configuration, the
//! object store contract with its S3 and in-memory adapters, the process-wide
//! bucket cache, key construction, upload classification, and the bucket
//! migration engine.
//!
//! # Architecture
//!
//! ```text
//!  objgate-http handlers        Migrator
//!            \                    /
//!             v                  v
//!          StoreClient (BucketCache + path::build_key)
//!                     |
//!                     v
//!              dyn ObjectStore
//!              /            \
//!         S3Store       InMemoryStore
//! ```

pub mod config;
pub mod error;
pub mod migrate;
pub mod path;
pub mod store;
pub mod upload;

pub use config::{GatewayConfig, StoreBackend};
pub use error::{GatewayError, GatewayResult, StoreError, StoreResult};
pub use migrate::{MigrationReport, MigrationRequest, Migrator, RenamePolicy};
pub use store::{InMemoryStore, ObjectStore, S3Store, StoreClient};
