use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::config::FilesConfig;
use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    DeleteFileResponseDto, FileResponseDto, FileUrlQuery, FileUrlResponseDto, FileVisibilityDto,
    SignedUrlQuery, SignedUrlResponseDto, UploadFieldsDto, UploadFileDto, UploadProfileImageDto,
    UploadedFileIdDto,
};
use crate::features::files::FilesState;
use crate::shared::constants::{FOLDER_UPLOADS, PURPOSE_GENERAL};
use crate::shared::mime::extension_from_content_type;
use crate::shared::types::{ApiResponse, Meta};
use crate::shared::validation::FILENAME_REGEX;

/// The `file` part of an upload form
struct UploadedFile {
    bytes: Vec<u8>,
    filename: String,
}

/// Read the `file` part plus any text fields from an upload form
async fn read_upload_form(
    multipart: &mut Multipart,
    config: &FilesConfig,
) -> Result<(UploadedFile, UploadFieldsDto), AppError> {
    let mut file: Option<UploadedFile> = None;
    let mut folder: Option<String> = None;
    let mut purpose: Option<String> = None;
    let mut visibility = FileVisibilityDto::default();
    let mut permissions: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                if !config.is_mime_type_allowed(&content_type) {
                    return Err(AppError::BadRequest(format!(
                        "File type '{}' is not allowed. Allowed types: {}",
                        content_type,
                        config.allowed_mime_types.join(", ")
                    )));
                }

                let filename = normalize_filename(field.file_name(), &content_type);

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(AppError::BadRequest("File is empty".to_string()));
                }
                if data.len() > config.max_upload_size {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File too large. Maximum size is {} bytes",
                        config.max_upload_size
                    )));
                }

                file = Some(UploadedFile {
                    bytes: data.to_vec(),
                    filename,
                });
            }
            "folder" => folder = non_empty(read_text(field, "folder").await?),
            "purpose" => purpose = non_empty(read_text(field, "purpose").await?),
            "visibility" => {
                let text = read_text(field, "visibility").await?;
                visibility = match text.trim().to_lowercase().as_str() {
                    "private" => FileVisibilityDto::Private,
                    "public" | "" => FileVisibilityDto::Public,
                    other => {
                        return Err(AppError::Validation(format!(
                            "visibility must be 'public' or 'private', got '{}'",
                            other
                        )))
                    }
                };
            }
            "permissions" => {
                if let Some(user_id) = non_empty(read_text(field, "permissions").await?) {
                    permissions.push(user_id);
                }
            }
            _ => debug!("Ignoring unknown field: {}", field_name),
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let fields = UploadFieldsDto {
        folder: folder.unwrap_or_else(|| FOLDER_UPLOADS.to_string()),
        purpose: purpose.unwrap_or_else(|| PURPOSE_GENERAL.to_string()),
        visibility,
        permissions,
    };

    Ok((file, fields))
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Keep the client's filename if it is safe, adding an extension when missing
fn normalize_filename(file_name: Option<&str>, content_type: &str) -> String {
    let name = file_name
        .map(|n| n.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(n).trim())
        .filter(|n| !n.is_empty())
        .unwrap_or("unnamed");
    let extension = extension_from_content_type(content_type);

    // Storage keys stay ASCII; anything else gets a generated name
    if !FILENAME_REGEX.is_match(name) {
        let generated = format!("upload_{}", &Uuid::new_v4().simple().to_string()[..12]);
        debug!("Renaming upload '{}' to '{}'", name, generated);
        return match extension {
            Some(ext) => format!("{}.{}", generated, ext),
            None => generated,
        };
    }

    match extension {
        Some(ext) if !name.contains('.') => format!("{}.{}", name, ext),
        _ => name.to_string(),
    }
}

/// Upload an image
///
/// Accepts multipart/form-data with:
/// - `file`: the image (required)
/// - `folder`: target folder (optional, defaults to "uploads")
/// - `purpose`: purpose tag (optional, defaults to "general")
/// - `visibility`: "public" or "private" (optional, defaults to "public")
/// - `permissions`: user id allowed to access a private file, repeatable
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "Image upload with folder, purpose, visibility and permissions",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid file or validation error"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File too large"),
        (status = 429, description = "Storage provider rate limit reached"),
        (status = 502, description = "Storage provider failure")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let (file, fields) = read_upload_form(&mut multipart, &state.config).await?;

    fields
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let folder = fields.folder.clone();
    let purpose = fields.purpose.clone();
    let permissions = fields.into_permissions(user.user_id());

    let record = state
        .service
        .upload(
            file.bytes,
            &file.filename,
            &folder,
            &purpose,
            user.user_id(),
            permissions,
        )
        .await?;

    let meta = Meta {
        provider: record.provider.clone(),
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(FileResponseDto::from(record)),
            Some("File uploaded successfully".to_string()),
            Some(meta),
        )),
    ))
}

/// Upload a profile image
///
/// Stored publicly under `images/profile`. Only the `file` field is read.
#[utoipa::path(
    post,
    path = "/api/files/profile-image",
    tag = "files",
    request_body(
        content = UploadProfileImageDto,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "Profile image uploaded", body = ApiResponse<UploadedFileIdDto>),
        (status = 400, description = "Invalid file"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File too large")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_profile_image(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedFileIdDto>>), AppError> {
    let (file, _) = read_upload_form(&mut multipart, &state.config).await?;

    let id = state
        .profile_image
        .execute(file.bytes, &file.filename, user.user_id())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(UploadedFileIdDto { id }),
            Some("Profile image uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// Get a file's URL
///
/// No authentication. Pass both `width` and `height` for a resized image.
#[utoipa::path(
    get,
    path = "/api/files/{id}/url",
    tag = "files",
    params(
        ("id" = String, Path, description = "File id"),
        FileUrlQuery
    ),
    responses(
        (status = 200, description = "File URL", body = ApiResponse<FileUrlResponseDto>),
        (status = 400, description = "Invalid dimensions"),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file_url(
    State(state): State<FilesState>,
    Path(id): Path<String>,
    Query(query): Query<FileUrlQuery>,
) -> Result<Json<ApiResponse<FileUrlResponseDto>>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let url = state
        .service
        .get_file_url(&id, query.width.as_deref(), query.height.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(
        Some(FileUrlResponseDto { url }),
        None,
        None,
    )))
}

/// Get a time-limited URL for a file
///
/// The caller must be listed in the file's permissions.
#[utoipa::path(
    get,
    path = "/api/files/{id}/signed-url",
    tag = "files",
    params(
        ("id" = String, Path, description = "File id"),
        SignedUrlQuery
    ),
    responses(
        (status = 200, description = "Signed URL", body = ApiResponse<SignedUrlResponseDto>),
        (status = 400, description = "Invalid expiry or dimensions"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not permitted to access this file"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_signed_url(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    Path(id): Path<String>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Json<ApiResponse<SignedUrlResponseDto>>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let expires_in = query
        .expire_in_seconds
        .unwrap_or(state.config.signed_url_default_expiry_secs);

    let url = state
        .service
        .get_file_signed_url(
            &id,
            user.user_id(),
            expires_in,
            query.width.as_deref(),
            query.height.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(SignedUrlResponseDto { url, expires_in }),
        None,
        None,
    )))
}

/// Delete a file
///
/// The caller must be listed in the file's permissions. The metadata is kept
/// when the storage provider reports nothing was deleted.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "Delete processed", body = ApiResponse<DeleteFileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not permitted to delete this file"),
        (status = 404, description = "File not found"),
        (status = 502, description = "Storage provider failure")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    let deleted = state.service.delete_file(&id, user.user_id()).await?;

    let message = if deleted {
        "File deleted successfully"
    } else {
        "Storage provider had nothing to delete"
    };

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted }),
        Some(message.to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filename_strips_client_paths() {
        assert_eq!(
            normalize_filename(Some("C:\\Users\\me\\avatar.png"), "image/png"),
            "avatar.png"
        );
        assert_eq!(
            normalize_filename(Some("../../avatar.png"), "image/png"),
            "avatar.png"
        );
    }

    #[test]
    fn test_normalize_filename_adds_extension() {
        assert_eq!(
            normalize_filename(Some("avatar"), "image/webp"),
            "avatar.webp"
        );
        assert_eq!(normalize_filename(None, "image/jpeg"), "unnamed.jpg");
    }

    #[test]
    fn test_normalize_filename_renames_hidden_files() {
        let name = normalize_filename(Some(".htaccess"), "image/png");
        assert!(name.starts_with("upload_"));
        assert!(name.ends_with(".png"));
        assert!(FILENAME_REGEX.is_match(&name));
    }

    #[test]
    fn test_normalize_filename_renames_non_ascii_names() {
        let name = normalize_filename(Some("фото отпуска.jpeg"), "image/jpeg");
        assert!(name.starts_with("upload_"));
        assert!(name.ends_with(".jpg"));
        assert!(FILENAME_REGEX.is_match(&name));

        let other = normalize_filename(Some("写真.webp"), "image/webp");
        assert_ne!(name.trim_end_matches(".jpg"), other.trim_end_matches(".webp"));
    }
}
