use std::fmt;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::modules::storage::{StorageError, StorageErrorKind};

/// Failure inside a metadata store
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Metadata store error: {0}")]
    Store(String),
}

/// Errors surfaced by the file service
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("File with id {id} not found")]
    NotFound { id: String },

    #[error("Access to file {id} denied for user {user_id}")]
    AccessDenied { id: String, user_id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

impl FileError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn access_denied(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::AccessDenied {
            id: id.into(),
            user_id: user_id.into(),
        }
    }

    /// Stable code reported to API clients
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Upload(e) => match e.kind {
                StorageErrorKind::BadRequest => ErrorCode::UploadBadRequest,
                StorageErrorKind::Forbidden => ErrorCode::UploadForbidden,
                StorageErrorKind::RateLimited => ErrorCode::UploadReachLimit,
                StorageErrorKind::Unauthorized => ErrorCode::UploadUnauthorized,
                StorageErrorKind::Provider | StorageErrorKind::MalformedData => {
                    ErrorCode::UploadError
                }
            },
            Self::NotFound { .. } => ErrorCode::FileNotFound,
            Self::AccessDenied { .. } => ErrorCode::AccessDenied,
            Self::Storage(_) => ErrorCode::StorageError,
            Self::Metadata(_) => ErrorCode::MetadataError,
        }
    }

    /// Component the failure originated from
    pub fn component(&self) -> &str {
        match self {
            Self::Upload(e) | Self::Storage(e) => &e.provider,
            Self::NotFound { .. } | Self::AccessDenied { .. } => "FileService",
            Self::Metadata(_) => "MetadataStore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UploadError,
    UploadBadRequest,
    UploadForbidden,
    UploadReachLimit,
    UploadUnauthorized,
    FileNotFound,
    AccessDenied,
    StorageError,
    MetadataError,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UploadError => "5001",
            Self::UploadBadRequest => "5002",
            Self::UploadForbidden => "5003",
            Self::UploadReachLimit => "5004",
            Self::UploadUnauthorized => "5005",
            Self::FileNotFound => "5006",
            Self::AccessDenied => "5007",
            Self::StorageError => "5008",
            Self::MetadataError => "5009",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UploadError => "UPLOAD_ERROR",
            Self::UploadBadRequest => "UPLOAD_BAD_REQUEST",
            Self::UploadForbidden => "UPLOAD_FORBIDDEN",
            Self::UploadReachLimit => "UPLOAD_REACH_LIMIT",
            Self::UploadUnauthorized => "UPLOAD_UNAUTHORIZED",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::StorageError => "STORAGE_ERROR",
            Self::MetadataError => "METADATA_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_codes_follow_storage_kind() {
        let cases = [
            (StorageErrorKind::BadRequest, "5002"),
            (StorageErrorKind::Forbidden, "5003"),
            (StorageErrorKind::RateLimited, "5004"),
            (StorageErrorKind::Unauthorized, "5005"),
            (StorageErrorKind::Provider, "5001"),
        ];
        for (kind, code) in cases {
            let err = FileError::Upload(StorageError::new(kind, "memory", "boom"));
            assert_eq!(err.code().code(), code, "kind {:?}", kind);
            assert_eq!(err.component(), "memory");
        }
    }

    #[test]
    fn test_lookup_and_permission_codes() {
        assert_eq!(FileError::not_found("1").code(), ErrorCode::FileNotFound);
        assert_eq!(
            FileError::access_denied("1", "u1").code(),
            ErrorCode::AccessDenied
        );
        assert_eq!(FileError::not_found("1").component(), "FileService");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "FILE_NOT_FOUND (5006)");
        assert_eq!(
            serde_json::to_string(&ErrorCode::UploadReachLimit).unwrap(),
            "\"UPLOAD_REACH_LIMIT\""
        );
    }
}
