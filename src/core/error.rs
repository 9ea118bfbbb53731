use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::features::files::errors::{ErrorCode, FileError};
use crate::modules::storage::StorageErrorKind;
use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    fn file_status(err: &FileError) -> StatusCode {
        match err {
            FileError::NotFound { .. } => StatusCode::NOT_FOUND,
            FileError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            FileError::Upload(e) | FileError::Storage(e) => match e.kind {
                StorageErrorKind::BadRequest => StatusCode::BAD_REQUEST,
                StorageErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                StorageErrorKind::Forbidden
                | StorageErrorKind::Unauthorized
                | StorageErrorKind::Provider
                | StorageErrorKind::MalformedData => StatusCode::BAD_GATEWAY,
            },
            FileError::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn file_response(err: FileError) -> (StatusCode, String, Option<ErrorCode>) {
        let status = Self::file_status(&err);
        let code = err.code();

        let message = if status.is_server_error() {
            tracing::error!("{} from {}: {}", code, err.component(), err);
            match &err {
                FileError::Metadata(_) => "File metadata could not be accessed".to_string(),
                _ => format!("Storage provider {} failed", err.component()),
            }
        } else {
            err.to_string()
        };

        (status, message, Some(code))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            AppError::File(err) => Self::file_response(err),
            AppError::Validation(ref msg) => {
                let body = ApiResponse::<()>::error(Some(msg.clone()), Some(vec![msg.clone()]));
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::PayloadTooLarge(ref msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, msg.clone(), None)
            }
            AppError::Auth(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
        };

        let mut body = ApiResponse::<()>::error(Some(message), None);
        if let Some(code) = code {
            body = body.with_code(code.code());
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::errors::MetadataError;
    use crate::modules::storage::StorageError;

    fn status_of(err: FileError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_file_errors_map_to_http_status() {
        assert_eq!(status_of(FileError::not_found("f1")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(FileError::access_denied("f1", "u1")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(FileError::Upload(StorageError::bad_request("memory", "bad"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FileError::Upload(StorageError::new(
                StorageErrorKind::RateLimited,
                "memory",
                "slow down"
            ))),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(FileError::Storage(StorageError::new(
                StorageErrorKind::Forbidden,
                "minio",
                "denied"
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(FileError::Metadata(MetadataError::Store("down".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_metadata_failure_hides_details() {
        let response = AppError::from(FileError::Metadata(MetadataError::Store(
            "password authentication failed".to_string(),
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "File metadata could not be accessed");
        assert!(!body.to_string().contains("password"));
    }

    #[test]
    fn test_app_errors_map_to_http_status() {
        assert_eq!(
            AppError::Unauthorized("x".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::PayloadTooLarge("x".to_string())
                .into_response()
                .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Validation("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::BadRequest("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth("x".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
