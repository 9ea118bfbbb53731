use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;

use super::{generate_id, MetadataStore};
use crate::core::config::DatabaseConfig;
use crate::features::files::errors::MetadataError;
use crate::features::files::models::{FileRecord, NewFileRecord};

/// Metadata store backed by the `files` table
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool and run pending migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, MetadataError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| MetadataError::Store(format!("Migration failed: {}", e)))?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn save(&self, record: NewFileRecord) -> Result<FileRecord, MetadataError> {
        let id = record.id.clone().unwrap_or_else(generate_id);

        let saved = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (id, provider, purpose, data, uploaded_by, permissions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, provider, purpose, data, uploaded_by, permissions, created_at
            "#,
        )
        .bind(&id)
        .bind(&record.provider)
        .bind(&record.purpose)
        .bind(&record.data)
        .bind(&record.uploaded_by)
        .bind(&record.permissions)
        .fetch_one(&self.pool)
        .await?;

        debug!("File record saved: id={}", saved.id);
        Ok(saved)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, MetadataError> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, provider, purpose, data, uploaded_by, permissions, created_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), MetadataError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(
            "File record delete: id={}, rows_affected={}",
            id,
            result.rows_affected()
        );
        Ok(())
    }
}
