//! In-process storage backend
//!
//! Keeps file bytes in memory and builds URLs the same way an image CDN would:
//! transformations go into a `tr` query parameter and signed URLs carry an
//! expiry timestamp (`ik-t`) plus an HMAC signature (`ik-s`). Useful for local
//! development and for exercising the file service without a network.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::backend::{unique_filename, Resize, StorageBackend};
use super::error::StorageError;
use super::PROVIDER_MEMORY;
use crate::core::config::MemoryStorageConfig;

type HmacSha256 = Hmac<Sha256>;

/// Upload result serialized into a file record's `data`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryFileData {
    file_id: String,
    name: String,
    file_path: String,
    url: String,
    is_private_file: bool,
    size: usize,
}

struct StoredObject {
    file_path: String,
    bytes: Vec<u8>,
}

pub struct MemoryStorage {
    base_url: String,
    signing_key: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub fn new(config: MemoryStorageConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signing_key: config.signing_key,
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently held
    #[cfg(test)]
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Check a signed URL's signature and expiry against `now` (unix seconds)
    #[cfg(test)]
    pub fn verify_signed_url(&self, url: &str, now: i64) -> bool {
        let Some(rest) = url.strip_prefix(&self.base_url) else {
            return false;
        };
        let Some((unsigned, signature)) = rest.rsplit_once("&ik-s=") else {
            return false;
        };
        let Some((_, expires)) = unsigned.rsplit_once("ik-t=") else {
            return false;
        };
        let Ok(expires) = expires.parse::<i64>() else {
            return false;
        };
        let unsigned = unsigned
            .strip_suffix(&format!("?ik-t={}", expires))
            .or_else(|| unsigned.strip_suffix(&format!("&ik-t={}", expires)))
            .unwrap_or(unsigned);

        match self.sign(unsigned, expires) {
            Ok(expected) => expected == signature && now <= expires,
            Err(_) => false,
        }
    }

    fn decode(&self, data: &str) -> Result<MemoryFileData, StorageError> {
        serde_json::from_str(data)
            .map_err(|e| StorageError::malformed_data(PROVIDER_MEMORY, e.to_string()))
    }

    fn build_path(folder: &str, filename: &str) -> String {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            format!("/{}", filename)
        } else {
            format!("/{}/{}", folder, filename)
        }
    }

    fn transformed_path(file_path: &str, resize: Option<Resize<'_>>) -> String {
        match resize {
            Some(r) => format!("{}?tr=w-{},h-{}", file_path, r.width, r.height),
            None => file_path.to_string(),
        }
    }

    fn sign(&self, path: &str, expires: i64) -> Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_key.as_bytes())
            .map_err(|e| StorageError::provider(PROVIDER_MEMORY, e.to_string()))?;
        mac.update(path.as_bytes());
        mac.update(expires.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn provider_name(&self) -> &str {
        PROVIDER_MEMORY
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
        is_private: bool,
    ) -> Result<String, StorageError> {
        if filename.trim().is_empty() {
            return Err(StorageError::bad_request(
                PROVIDER_MEMORY,
                "filename must not be empty",
            ));
        }

        let mut objects = self.objects.write().await;

        let mut name = filename.to_string();
        let mut file_path = Self::build_path(folder, &name);
        if objects.values().any(|o| o.file_path == file_path) {
            name = unique_filename(filename);
            file_path = Self::build_path(folder, &name);
        }

        let file_id = Uuid::new_v4().simple().to_string();
        let file_data = MemoryFileData {
            file_id: file_id.clone(),
            name,
            url: format!("{}{}", self.base_url, file_path),
            file_path: file_path.clone(),
            is_private_file: is_private,
            size: bytes.len(),
        };

        objects.insert(file_id, StoredObject { file_path, bytes });

        debug!(
            "Stored '{}' in memory storage (private={})",
            file_data.file_path, is_private
        );

        serde_json::to_string(&file_data)
            .map_err(|e| StorageError::provider(PROVIDER_MEMORY, e.to_string()))
    }

    fn file_url(
        &self,
        data: &str,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String, StorageError> {
        let file_data = self.decode(data)?;
        let path = Self::transformed_path(
            &file_data.file_path,
            Resize::from_dimensions(width, height),
        );
        Ok(format!("{}{}", self.base_url, path))
    }

    async fn signed_url(
        &self,
        data: &str,
        expire_in_seconds: u32,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String, StorageError> {
        let file_data = self.decode(data)?;
        let path = Self::transformed_path(
            &file_data.file_path,
            Resize::from_dimensions(width, height),
        );
        let expires = Utc::now().timestamp() + i64::from(expire_in_seconds);
        let signature = self.sign(&path, expires)?;
        let separator = if path.contains('?') { '&' } else { '?' };

        Ok(format!(
            "{}{}{}ik-t={}&ik-s={}",
            self.base_url, path, separator, expires, signature
        ))
    }

    async fn delete(&self, data: &str) -> Result<bool, StorageError> {
        let file_data = self.decode(data)?;
        let removed = self.objects.write().await.remove(&file_data.file_id);

        match removed {
            Some(object) => {
                debug!(
                    "Removed '{}' from memory storage ({} bytes freed)",
                    object.file_path,
                    object.bytes.len()
                );
                Ok(true)
            }
            None => {
                debug!("'{}' not held in memory storage", file_data.file_path);
                Ok(false)
            }
        }
    }
}
