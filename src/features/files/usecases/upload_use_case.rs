use std::sync::Arc;

use tracing::debug;

use crate::features::files::errors::FileError;
use crate::features::files::services::FileService;
use crate::shared::constants::{FOLDER_PROFILE_IMAGES, PURPOSE_PROFILE_IMAGE};

/// An upload flow with a fixed folder and purpose, producing public files
pub struct UploadUseCase {
    service: Arc<FileService>,
    folder: String,
    purpose: String,
}

impl UploadUseCase {
    pub fn new(
        service: Arc<FileService>,
        folder: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Self {
        Self {
            service,
            folder: folder.into(),
            purpose: purpose.into(),
        }
    }

    /// Profile images: public, under `images/profile`
    pub fn profile_image(service: Arc<FileService>) -> Self {
        Self::new(service, FOLDER_PROFILE_IMAGES, PURPOSE_PROFILE_IMAGE)
    }

    /// Upload and return the new file's id
    pub async fn execute(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        user_id: &str,
    ) -> Result<String, FileError> {
        let record = self
            .service
            .upload(bytes, filename, &self.folder, &self.purpose, user_id, None)
            .await?;

        debug!("{} upload stored as {}", self.purpose, record.id);
        Ok(record.id)
    }
}
