mod upload_use_case;

pub use upload_use_case::UploadUseCase;
