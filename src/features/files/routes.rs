use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::features::files::handlers::{
    delete_file, get_file_signed_url, get_file_url, upload_file, upload_profile_image,
};
use crate::features::files::FilesState;

/// Room for multipart boundaries and text fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Routes that need an authenticated user
pub fn routes(state: FilesState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_size + MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/files/upload", post(upload_file).layer(body_limit))
        .route(
            "/api/files/profile-image",
            post(upload_profile_image).layer(body_limit),
        )
        .route("/api/files/{id}/signed-url", get(get_file_signed_url))
        .route("/api/files/{id}", delete(delete_file))
        .with_state(state)
}

/// Routes open to anyone
pub fn public_routes(state: FilesState) -> Router {
    Router::new()
        .route("/api/files/{id}/url", get(get_file_url))
        .with_state(state)
}
