// =============================================================================
// UPLOAD PRESETS
// =============================================================================

/// Folder that profile images are stored under
pub const FOLDER_PROFILE_IMAGES: &str = "images/profile";

/// Purpose tag recorded for profile images
pub const PURPOSE_PROFILE_IMAGE: &str = "profile-image";

/// Purpose tag for uploads that do not name one
pub const PURPOSE_GENERAL: &str = "general";

/// Folder used when an upload does not name one
pub const FOLDER_UPLOADS: &str = "uploads";

// =============================================================================
// SIGNED URLS
// =============================================================================

/// Longest lifetime a signed URL may be issued for (7 days)
pub const MAX_SIGNED_URL_EXPIRY_SECS: u32 = 604_800;
