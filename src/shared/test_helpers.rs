use std::sync::Arc;

use axum::{extract::Request, middleware::Next, response::Response, Router};

use crate::core::config::{FilesConfig, MemoryStorageConfig};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::services::{AccessPolicy, FileService};
use crate::features::files::stores::InMemoryMetadataStore;
use crate::modules::storage::MemoryStorage;

pub const TEST_USER_ID: &str = "test-user";
pub const TEST_STORAGE_BASE_URL: &str = "https://files.test";

pub fn create_test_user(sub: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        sub: sub.to_string(),
        session_uid: Some("test-session-uid".to_string()),
    }
}

/// Wrap `router` so every request carries `sub` as the authenticated user
pub fn with_user_auth(router: Router, sub: &'static str) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| async move {
            request.extensions_mut().insert(create_test_user(sub));
            next.run(request).await
        },
    ))
}

pub fn with_test_user_auth(router: Router) -> Router {
    with_user_auth(router, TEST_USER_ID)
}

/// File service over in-memory backends, plus handles for inspecting them
pub fn memory_file_service(
    policy: AccessPolicy,
) -> (Arc<FileService>, Arc<InMemoryMetadataStore>, Arc<MemoryStorage>) {
    let store = Arc::new(InMemoryMetadataStore::new());
    let storage = Arc::new(MemoryStorage::new(MemoryStorageConfig {
        base_url: TEST_STORAGE_BASE_URL.to_string(),
        signing_key: "test-signing-key".to_string(),
    }));
    let service = Arc::new(FileService::with_policy(
        store.clone(),
        storage.clone(),
        policy,
    ));
    (service, store, storage)
}

pub fn test_files_config() -> FilesConfig {
    FilesConfig {
        max_upload_size: 1024 * 1024,
        ..FilesConfig::default()
    }
}
