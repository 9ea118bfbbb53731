pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;
pub mod usecases;

use std::sync::Arc;

use crate::core::config::FilesConfig;

pub use routes::{public_routes, routes};
pub use services::{AccessPolicy, FileService};
pub use usecases::UploadUseCase;

/// Shared state of the files routes
#[derive(Clone)]
pub struct FilesState {
    pub service: Arc<FileService>,
    pub profile_image: Arc<UploadUseCase>,
    pub config: Arc<FilesConfig>,
}

impl FilesState {
    pub fn new(service: Arc<FileService>, config: FilesConfig) -> Self {
        Self {
            profile_image: Arc::new(UploadUseCase::profile_image(Arc::clone(&service))),
            service,
            config: Arc::new(config),
        }
    }
}
