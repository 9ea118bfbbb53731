use async_trait::async_trait;
use uuid::Uuid;

use super::error::StorageError;

/// Capability interface over one object-storage provider.
///
/// `data` is the provider-specific payload returned by [`upload`](Self::upload).
/// Only the backend that produced it knows how to read it; everybody else
/// stores and hands it back verbatim.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Static identifier recorded alongside every file this backend stores
    fn provider_name(&self) -> &str;

    /// Store `bytes` under `folder/filename` and return the opaque file data
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
        is_private: bool,
    ) -> Result<String, StorageError>;

    /// Build a direct, non-expiring URL.
    ///
    /// A scaled rendition is requested only when both `width` and `height`
    /// are present; otherwise the original is addressed.
    fn file_url(
        &self,
        data: &str,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Build a time-limited URL; expiry is enforced by the provider.
    async fn signed_url(
        &self,
        data: &str,
        expire_in_seconds: u32,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Delete the physical object, returning whether a deletion occurred
    async fn delete(&self, data: &str) -> Result<bool, StorageError>;
}

/// Requested rendition size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize<'a> {
    pub width: &'a str,
    pub height: &'a str,
}

impl<'a> Resize<'a> {
    /// Only a complete pair of dimensions yields a resize; a lone width or
    /// height is ignored.
    pub fn from_dimensions(width: Option<&'a str>, height: Option<&'a str>) -> Option<Self> {
        match (width, height) {
            (Some(width), Some(height)) => Some(Self { width, height }),
            _ => None,
        }
    }
}

/// Give a colliding name a random suffix: `photo.jpg` becomes `photo_1a2b3c4d.jpg`
pub(crate) fn unique_filename(filename: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    let suffix = &id[..8];
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", filename, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_requires_both_dimensions() {
        assert_eq!(
            Resize::from_dimensions(Some("100"), Some("200")),
            Some(Resize {
                width: "100",
                height: "200"
            })
        );
        assert_eq!(Resize::from_dimensions(Some("100"), None), None);
        assert_eq!(Resize::from_dimensions(None, Some("100")), None);
        assert_eq!(Resize::from_dimensions(None, None), None);
    }

    #[test]
    fn test_unique_filename_keeps_extension() {
        let name = unique_filename("photo.jpg");
        assert!(name.starts_with("photo_"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), "photo_.jpg".len() + 8);

        assert!(unique_filename("README").starts_with("README_"));
        assert_ne!(unique_filename("a.png"), unique_filename("a.png"));
    }
}
