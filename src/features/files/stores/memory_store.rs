use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{generate_id, MetadataStore};
use crate::features::files::errors::MetadataError;
use crate::features::files::models::{FileRecord, NewFileRecord};

/// Metadata store backed by a process-local map
#[derive(Default)]
pub struct InMemoryMetadataStore {
    records: RwLock<HashMap<String, FileRecord>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn save(&self, record: NewFileRecord) -> Result<FileRecord, MetadataError> {
        let id = record.id.clone().unwrap_or_else(generate_id);
        let mut records = self.records.write().await;

        if records.contains_key(&id) {
            return Err(MetadataError::Store(format!(
                "File record with id {} already exists",
                id
            )));
        }

        let saved = record.into_record(id.clone(), Utc::now());
        records.insert(id, saved.clone());
        Ok(saved)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, MetadataError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), MetadataError> {
        self.records.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(id: Option<&str>) -> NewFileRecord {
        NewFileRecord {
            id: id.map(str::to_string),
            provider: "memory".to_string(),
            purpose: "test".to_string(),
            data: r#"{"fileId":"abc"}"#.to_string(),
            uploaded_by: "u1".to_string(),
            permissions: Some(vec!["u1".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_when_absent() {
        let store = InMemoryMetadataStore::new();
        let first = store.save(new_record(None)).await.unwrap();
        let second = store.save(new_record(None)).await.unwrap();

        assert!(!first.id.is_empty());
        assert_ne!(first.id, second.id);
        assert_eq!(store.find_by_id(&first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_save_keeps_provided_id() {
        let store = InMemoryMetadataStore::new();
        let saved = store.save(new_record(Some("fixed"))).await.unwrap();
        assert_eq!(saved.id, "fixed");

        let err = store.save(new_record(Some("fixed"))).await.unwrap_err();
        assert!(matches!(err, MetadataError::Store(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryMetadataStore::new();
        let saved = store.save(new_record(None)).await.unwrap();

        store.delete_by_id(&saved.id).await.unwrap();
        store.delete_by_id(&saved.id).await.unwrap();
        store.delete_by_id("never-existed").await.unwrap();

        assert_eq!(store.find_by_id(&saved.id).await.unwrap(), None);
        assert_eq!(store.record_count().await, 0);
    }
}
