//! Metadata persistence for file records

mod memory_store;
mod postgres_store;

use async_trait::async_trait;

use crate::features::files::errors::MetadataError;
use crate::features::files::models::{FileRecord, NewFileRecord};

pub use memory_store::InMemoryMetadataStore;
pub use postgres_store::PgMetadataStore;

/// Key-value persistence of file records, keyed by `id`
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a record, assigning an id if it has none
    async fn save(&self, record: NewFileRecord) -> Result<FileRecord, MetadataError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, MetadataError>;

    /// Remove a record; a missing id is not an error
    async fn delete_by_id(&self, id: &str) -> Result<(), MetadataError>;
}

/// Time-ordered id for stores that assign their own
pub(crate) fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
