use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::files::errors::ErrorCode;
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        files_handlers::upload_file,
        files_handlers::upload_profile_image,
        files_handlers::get_file_url,
        files_handlers::get_file_signed_url,
        files_handlers::delete_file,
    ),
    components(
        schemas(
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<files_dtos::UploadedFileIdDto>,
            ApiResponse<files_dtos::FileUrlResponseDto>,
            ApiResponse<files_dtos::SignedUrlResponseDto>,
            ApiResponse<files_dtos::DeleteFileResponseDto>,
            Meta,
            ErrorCode,
            files_dtos::FileVisibilityDto,
            files_dtos::UploadFileDto,
            files_dtos::UploadProfileImageDto,
            files_dtos::FileResponseDto,
            files_dtos::UploadedFileIdDto,
            files_dtos::FileUrlResponseDto,
            files_dtos::SignedUrlResponseDto,
            files_dtos::DeleteFileResponseDto,
        )
    ),
    tags(
        (name = "files", description = "Image upload, URLs and access control"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Filegate API",
        version = "0.1.0",
        description = "Image storage with per-file access control",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
