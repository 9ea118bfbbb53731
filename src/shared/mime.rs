/// Allowed MIME types for uploads when none are configured
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Guess a content type from a filename's extension
pub fn content_type_from_filename(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Get file extension from content type
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_filename() {
        assert_eq!(content_type_from_filename("a.JPG"), "image/jpeg");
        assert_eq!(content_type_from_filename("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_from_filename("archive.tar.png"), "image/png");
        assert_eq!(content_type_from_filename("noext"), "application/octet-stream");
    }

    #[test]
    fn test_extension_round_trips_for_images() {
        for content_type in DEFAULT_ALLOWED_MIME_TYPES {
            let ext = extension_from_content_type(content_type).unwrap();
            assert_eq!(content_type_from_filename(&format!("f.{}", ext)), *content_type);
        }
    }
}
