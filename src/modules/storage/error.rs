//! Storage error types.

use std::fmt;

use thiserror::Error;

/// Failure categories reported by a storage provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// The provider rejected the input as malformed.
    BadRequest,
    /// The provider refused the operation.
    Forbidden,
    /// The provider throttled the caller.
    RateLimited,
    /// The configured credentials were rejected.
    Unauthorized,
    /// Any other provider-side failure.
    Provider,
    /// The stored file data could not be decoded by this backend.
    MalformedData,
}

impl StorageErrorKind {
    /// Classify an HTTP status returned by a provider.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            429 | 503 => Self::RateLimited,
            _ => Self::Provider,
        }
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BadRequest => "bad request",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate limited",
            Self::Unauthorized => "unauthorized",
            Self::Provider => "provider error",
            Self::MalformedData => "malformed file data",
        };
        f.write_str(label)
    }
}

/// Error raised by a [`StorageBackend`](super::StorageBackend).
///
/// Carries the name of the provider that produced it so callers can report
/// the originating component without knowing the concrete backend.
#[derive(Debug, Clone, Error)]
#[error("{provider} {kind}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub provider: String,
    pub message: String,
}

impl StorageError {
    pub fn new(
        kind: StorageErrorKind,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::BadRequest, provider, message)
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Provider, provider, message)
    }

    pub fn malformed_data(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::MalformedData, provider, message)
    }

    /// Build an error from a non-success HTTP response.
    pub fn from_status(provider: impl Into<String>, status: u16, body: &str) -> Self {
        Self::new(
            StorageErrorKind::from_status(status),
            provider,
            format!("HTTP {}: {}", status, body),
        )
    }
}
