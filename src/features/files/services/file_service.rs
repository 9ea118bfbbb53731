use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::features::files::errors::FileError;
use crate::features::files::models::{FileRecord, NewFileRecord};
use crate::features::files::stores::MetadataStore;
use crate::modules::storage::StorageBackend;

type Result<T> = std::result::Result<T, FileError>;

/// Who may fetch signed URLs for, and delete, a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPolicy {
    /// The file must carry permissions and list the caller. Public files
    /// (no permissions) can never be signed or deleted, not even by the
    /// uploader.
    #[default]
    ExplicitPermissions,
    /// As above, but the uploader is always allowed.
    OwnerImplied,
}

impl AccessPolicy {
    pub fn allows(&self, file: &FileRecord, user_id: &str) -> bool {
        match self {
            Self::ExplicitPermissions => file.grants(user_id),
            Self::OwnerImplied => file.uploaded_by == user_id || file.grants(user_id),
        }
    }
}

impl FromStr for AccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit" => Ok(Self::ExplicitPermissions),
            "owner" => Ok(Self::OwnerImplied),
            other => Err(format!(
                "FILES_ACCESS_POLICY must be 'explicit' or 'owner', got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitPermissions => f.write_str("explicit"),
            Self::OwnerImplied => f.write_str("owner"),
        }
    }
}

/// Mediates every file operation between the metadata store and the
/// storage backend, enforcing per-file permissions.
pub struct FileService {
    store: Arc<dyn MetadataStore>,
    storage: Arc<dyn StorageBackend>,
    policy: AccessPolicy,
}

impl FileService {
    pub fn new(store: Arc<dyn MetadataStore>, storage: Arc<dyn StorageBackend>) -> Self {
        Self::with_policy(store, storage, AccessPolicy::default())
    }

    pub fn with_policy(
        store: Arc<dyn MetadataStore>,
        storage: Arc<dyn StorageBackend>,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            store,
            storage,
            policy,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.storage.provider_name()
    }

    /// Store `bytes` and record who may access them.
    ///
    /// `permissions == None` makes the file public. The physical upload is
    /// not rolled back when the metadata write fails.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
        purpose: &str,
        uploaded_by: &str,
        permissions: Option<Vec<String>>,
    ) -> Result<FileRecord> {
        let is_private = permissions.is_some();
        let size = bytes.len();

        let data = self
            .storage
            .upload(bytes, filename, folder, is_private)
            .await
            .map_err(FileError::Upload)?;

        debug!(
            "Stored '{}/{}' via {} ({} bytes, private={})",
            folder,
            filename,
            self.storage.provider_name(),
            size,
            is_private
        );

        let new_record = NewFileRecord {
            id: None,
            provider: self.storage.provider_name().to_string(),
            purpose: purpose.to_string(),
            data,
            uploaded_by: uploaded_by.to_string(),
            permissions: permissions.map(dedup),
        };

        let record = match self.store.save(new_record.clone()).await {
            Ok(record) => record,
            Err(e) => {
                error!(
                    "Metadata save failed after upload; object left orphaned in {}: data={}, error={}",
                    new_record.provider, new_record.data, e
                );
                return Err(e.into());
            }
        };

        info!(
            "File uploaded: id={}, provider={}, purpose={}, uploaded_by={}, private={}",
            record.id,
            record.provider,
            record.purpose,
            record.uploaded_by,
            record.is_private()
        );

        Ok(record)
    }

    /// Plain URL for any known file; no permission check.
    pub async fn get_file_url(
        &self,
        id: &str,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String> {
        let file = self.find(id).await?;
        Ok(self.storage.file_url(&file.data, width, height)?)
    }

    /// Time-limited URL for a caller the access policy allows
    pub async fn get_file_signed_url(
        &self,
        id: &str,
        user_id: &str,
        expire_in_seconds: u32,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String> {
        let file = self.find(id).await?;
        self.authorize(&file, user_id)?;

        let url = self
            .storage
            .signed_url(&file.data, expire_in_seconds, width, height)
            .await?;

        debug!(
            "Signed URL issued: id={}, user={}, expires_in={}s",
            id, user_id, expire_in_seconds
        );
        Ok(url)
    }

    /// Delete the object, then its metadata.
    ///
    /// Metadata is only removed once the backend reports a deletion; a
    /// backend failure leaves the record in place.
    pub async fn delete_file(&self, id: &str, user_id: &str) -> Result<bool> {
        let file = self.find(id).await?;
        self.authorize(&file, user_id)?;

        let deleted = self.storage.delete(&file.data).await?;
        if !deleted {
            warn!(
                "Storage reported nothing deleted for file {}; keeping metadata",
                id
            );
            return Ok(false);
        }

        self.store.delete_by_id(id).await?;

        info!("File deleted: id={}, by={}", id, user_id);
        Ok(true)
    }

    async fn find(&self, id: &str) -> Result<FileRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| FileError::not_found(id))
    }

    fn authorize(&self, file: &FileRecord, user_id: &str) -> Result<()> {
        if self.policy.allows(file, user_id) {
            Ok(())
        } else {
            debug!(
                "Access denied: id={}, user={}, policy={}",
                file.id, user_id, self.policy
            );
            Err(FileError::access_denied(&file.id, user_id))
        }
    }
}

/// Treat permissions as a set while keeping first-seen order
fn dedup(permissions: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(permissions.len());
    for p in permissions {
        if !unique.contains(&p) {
            unique.push(p);
        }
    }
    unique
}
