use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::files::models::FileRecord;
use crate::shared::constants::MAX_SIGNED_URL_EXPIRY_SECS;
use crate::shared::validation::{DIMENSION_REGEX, FOLDER_REGEX, PURPOSE_REGEX};

/// File visibility as sent in the upload form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileVisibilityDto {
    /// Anyone with the id can get a URL; no signed URLs, no deletes
    #[default]
    Public,
    /// Only users listed in `permissions` get signed URLs
    Private,
}

/// Upload form for OpenAPI documentation.
/// The handler reads the multipart body directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The image to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Target folder, e.g. "images/gallery" (default: "uploads")
    #[schema(example = "images/gallery")]
    pub folder: Option<String>,
    /// Purpose tag (default: "general")
    #[schema(example = "gallery")]
    pub purpose: Option<String>,
    /// "public" (default) or "private"
    #[schema(example = "private")]
    pub visibility: Option<String>,
    /// User ids allowed to access a private file; repeat the field per user.
    /// The uploader is always included for private files.
    pub permissions: Option<Vec<String>>,
}

/// Profile image upload form for OpenAPI documentation
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadProfileImageDto {
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Validated upload form fields other than the file itself
#[derive(Debug, Clone, Validate)]
pub struct UploadFieldsDto {
    #[validate(regex(path = *FOLDER_REGEX, message = "folder must be '/'-separated segments of letters, digits, '-' or '_'"))]
    pub folder: String,
    #[validate(regex(path = *PURPOSE_REGEX, message = "purpose must be lowercase alphanumeric words separated by '-'"))]
    pub purpose: String,
    pub visibility: FileVisibilityDto,
    pub permissions: Vec<String>,
}

impl UploadFieldsDto {
    /// Permissions handed to the service; `None` keeps the file public
    pub fn into_permissions(self, uploader: &str) -> Option<Vec<String>> {
        match self.visibility {
            FileVisibilityDto::Public => None,
            FileVisibilityDto::Private => {
                let mut permissions = vec![uploader.to_string()];
                permissions.extend(self.permissions);
                Some(permissions)
            }
        }
    }
}

/// Metadata of a stored file
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: String,
    /// Storage provider holding the object
    pub provider: String,
    pub purpose: String,
    pub uploaded_by: String,
    pub visibility: FileVisibilityDto,
    /// Users allowed to fetch signed URLs; absent for public files
    pub permissions: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponseDto {
    fn from(record: FileRecord) -> Self {
        let visibility = if record.is_private() {
            FileVisibilityDto::Private
        } else {
            FileVisibilityDto::Public
        };

        Self {
            id: record.id,
            provider: record.provider,
            purpose: record.purpose,
            uploaded_by: record.uploaded_by,
            visibility,
            permissions: record.permissions,
            created_at: record.created_at,
        }
    }
}

/// Id of a newly uploaded file
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadedFileIdDto {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileUrlResponseDto {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignedUrlResponseDto {
    pub url: String,
    /// Seconds the URL stays valid for
    pub expires_in: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// False when the storage provider had nothing to delete
    pub deleted: bool,
}

/// Optional resize for image URLs. Both dimensions are needed for a resize
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
pub struct FileUrlQuery {
    /// Target width in pixels
    #[validate(regex(path = *DIMENSION_REGEX, message = "width must be a positive integer up to 9999"))]
    pub width: Option<String>,
    /// Target height in pixels
    #[validate(regex(path = *DIMENSION_REGEX, message = "height must be a positive integer up to 9999"))]
    pub height: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
pub struct SignedUrlQuery {
    /// Seconds until the URL expires (default from server config, max 7 days)
    #[param(minimum = 1, maximum = 604800)]
    #[validate(range(min = 1, max = MAX_SIGNED_URL_EXPIRY_SECS, message = "expire_in_seconds must be between 1 and 604800"))]
    pub expire_in_seconds: Option<u32>,
    /// Target width in pixels
    #[validate(regex(path = *DIMENSION_REGEX, message = "width must be a positive integer up to 9999"))]
    pub width: Option<String>,
    /// Target height in pixels
    #[validate(regex(path = *DIMENSION_REGEX, message = "height must be a positive integer up to 9999"))]
    pub height: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fields(visibility: FileVisibilityDto, permissions: &[&str]) -> UploadFieldsDto {
        UploadFieldsDto {
            folder: "images/gallery".to_string(),
            purpose: "gallery".to_string(),
            visibility,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_public_upload_drops_permissions() {
        let dto = fields(FileVisibilityDto::Public, &["u2"]);
        assert_eq!(dto.into_permissions("u1"), None);
    }

    #[test]
    fn test_private_upload_includes_uploader() {
        let dto = fields(FileVisibilityDto::Private, &["u2"]);
        assert_eq!(
            dto.into_permissions("u1"),
            Some(vec!["u1".to_string(), "u2".to_string()])
        );
    }

    #[test]
    fn test_upload_fields_validation() {
        assert!(fields(FileVisibilityDto::Public, &[]).validate().is_ok());

        let mut bad_folder = fields(FileVisibilityDto::Public, &[]);
        bad_folder.folder = "../etc".to_string();
        assert!(bad_folder.validate().is_err());

        let mut bad_purpose = fields(FileVisibilityDto::Public, &[]);
        bad_purpose.purpose = "Profile Image".to_string();
        assert!(bad_purpose.validate().is_err());
    }

    #[test]
    fn test_signed_url_query_validation() {
        let ok = SignedUrlQuery {
            expire_in_seconds: Some(60),
            width: Some("100".to_string()),
            height: Some("100".to_string()),
        };
        assert!(ok.validate().is_ok());
        assert!(SignedUrlQuery::default().validate().is_ok());

        let zero = SignedUrlQuery {
            expire_in_seconds: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let too_long = SignedUrlQuery {
            expire_in_seconds: Some(MAX_SIGNED_URL_EXPIRY_SECS + 1),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let bad_width = FileUrlQuery {
            width: Some("wide".to_string()),
            height: None,
        };
        assert!(bad_width.validate().is_err());
    }

    #[test]
    fn test_response_from_record() {
        let record = FileRecord {
            id: "f1".to_string(),
            provider: "memory".to_string(),
            purpose: "test".to_string(),
            data: "{}".to_string(),
            uploaded_by: "u1".to_string(),
            permissions: Some(vec!["u1".to_string()]),
            created_at: Utc::now(),
        };

        let dto = FileResponseDto::from(record);

        assert_eq!(dto.id, "f1");
        assert_eq!(dto.visibility, FileVisibilityDto::Private);
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("data").is_none());
    }
}
