//! Bulk object migration between buckets.
//!
//! A migration lists one or more prefixes of a source bucket, renames each
//! key, applies the overwrite policy, copies server-side, and optionally
//! removes the source. Per-key and per-prefix problems never abort the run;
//! they are collected into a [`MigrationReport`]. The only call-level error
//! is failing to verify or create the destination bucket.

mod engine;
mod rename;
mod report;

pub use engine::{DEFAULT_CONCURRENCY, MigrationRequest, Migrator};
pub use rename::{RenameFn, RenamePolicy};
pub use report::{FailureKind, MigrationFailure, MigrationReport};
