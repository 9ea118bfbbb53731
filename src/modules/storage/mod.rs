//! Storage module for physical file objects
//!
//! Defines the [`StorageBackend`] capability that the file service talks to,
//! plus the concrete backends: an S3-compatible MinIO client and an
//! in-process store for development and tests.

mod backend;
mod error;
mod memory_storage;
mod minio_client;

pub use backend::{Resize, StorageBackend};
pub use error::{StorageError, StorageErrorKind};
pub use memory_storage::MemoryStorage;
pub use minio_client::MinIOClient;

/// Provider name for the MinIO/S3 backend
pub const PROVIDER_MINIO: &str = "minio";

/// Provider name for the in-process backend
pub const PROVIDER_MEMORY: &str = "memory";
